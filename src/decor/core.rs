// src/decor/core.rs
//! Core types/traits for slot-based decoration placement.
//! Keep this file dependency-light; placement, slots and the board build on it.

use bevy::math::Ray3d;
use bevy::prelude::*; // Vec3, Transform, StandardMaterial
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------- Keys ----------

/// Stable name of a decoration type (e.g. "strawberry"). One entry per key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecorKey(pub String);

impl DecorKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Display name with the first letter upper-cased ("strawberry" -> "Strawberry").
    pub fn label(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl From<&str> for DecorKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for DecorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------- Bounds ----------

/// Axis-aligned box. Local to whatever space produced it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the given half extents.
    pub fn from_center_half(center: Vec3, half: Vec3) -> Self {
        Self { min: center - half, max: center + half }
    }

    /// Smallest box holding every point; `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut b = Self { min: first, max: first };
        for p in it {
            b.min = b.min.min(p);
            b.max = b.max.max(p);
        }
        Some(b)
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds { min: self.min.min(other.min), max: self.max.max(other.max) }
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }

    /// AABB of this box after `transform` (parent space).
    pub fn transformed(&self, transform: &Transform) -> Bounds {
        let corners = self.corners().map(|c| transform.transform_point(c));
        let mut b = Bounds { min: corners[0], max: corners[0] };
        for c in &corners[1..] {
            b.min = b.min.min(*c);
            b.max = b.max.max(*c);
        }
        b
    }
}

// ---------- Bodies ----------

/// Authoritative placement of one decoration: its transform plus the
/// bounds of its geometry in its own (unscaled) space.
#[derive(Clone, Debug, PartialEq)]
pub struct DecorBody {
    pub transform: Transform,
    pub local_bounds: Bounds,
}

impl DecorBody {
    pub fn new(transform: Transform, local_bounds: Bounds) -> Self {
        Self { transform, local_bounds }
    }

    /// World-space bounding box under the current transform.
    pub fn world_bounds(&self) -> Bounds {
        self.local_bounds.transformed(&self.transform)
    }

    pub fn position(&self) -> Vec3 {
        self.transform.translation
    }
}

// ---------- Surface ----------

/// Perimeter metrics of the loaded surface.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceMetrics {
    /// Y of the highest point (apex) of the surface.
    pub top_height: f32,
    /// Radius of the slot ring.
    pub radius: f32,
}

impl SurfaceMetrics {
    /// Fraction of the half-footprint used for the slot ring.
    pub const RING_INSET: f32 = 0.9;

    /// Derive metrics from the surface's world bounding box.
    pub fn from_bounds(bounds: &Bounds) -> Self {
        let size = bounds.size();
        Self {
            top_height: bounds.max.y,
            radius: size.x.max(size.z) * 0.5 * Self::RING_INSET,
        }
    }
}

/// One ray/surface intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceHit {
    /// Distance along the ray from its origin.
    pub distance: f32,
    pub point: Vec3,
}

/// Ray-castable reference surface (the cake).
pub trait SurfaceCaster: Send + Sync + 'static {
    /// All hits along `ray`, nearest first.
    fn cast_ray(&self, ray: Ray3d) -> Vec<SurfaceHit>;

    /// Nearest hit along `ray`, if any.
    fn nearest_hit(&self, ray: Ray3d) -> Option<SurfaceHit> {
        self.cast_ray(ray).into_iter().next()
    }
}

// ---------- Materials ----------

/// Material tuning for decoration meshes. Each known material kind is its own
/// variant, and applying one is an exhaustive match.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum MaterialTuning {
    /// Plain PBR surface.
    Matte { roughness: f32, metalness: f32 },
    /// PBR surface with a clear lacquer layer (chocolate, glaze).
    Glossy {
        roughness: f32,
        metalness: f32,
        clearcoat: f32,
        clearcoat_roughness: f32,
    },
    /// Emissive-looking, ignores lights (candle flame).
    Unlit,
}

impl Default for MaterialTuning {
    fn default() -> Self {
        Self::Matte { roughness: 0.6, metalness: 0.0 }
    }
}

impl MaterialTuning {
    pub fn apply(&self, mat: &mut StandardMaterial) {
        match *self {
            MaterialTuning::Matte { roughness, metalness } => {
                mat.perceptual_roughness = roughness;
                mat.metallic = metalness;
                mat.unlit = false;
            }
            MaterialTuning::Glossy { roughness, metalness, clearcoat, clearcoat_roughness } => {
                mat.perceptual_roughness = roughness;
                mat.metallic = metalness;
                mat.clearcoat = clearcoat;
                mat.clearcoat_perceptual_roughness = clearcoat_roughness;
                mat.unlit = false;
            }
            MaterialTuning::Unlit => {
                mat.unlit = true;
            }
        }
    }
}
