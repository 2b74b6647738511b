// src/decor/geometry.rs
//! Bounding-box helpers: height fitting, base offsets, surface normalization.

use bevy::prelude::*;

use super::core::{Bounds, DecorBody};

/// Surfaces whose largest dimension exceeds this are shrunk on load.
pub const SURFACE_MAX_DIM: f32 = 5.0;
/// Largest dimension after shrinking.
pub const SURFACE_FIT_DIM: f32 = 2.0;

/// Scale `body` uniformly so its world bounding-box height equals `target_h`.
/// A zero-height box is treated as height 1.
pub fn fit_to_height(body: &mut DecorBody, target_h: f32) {
    let h = body.world_bounds().height();
    let h = if h == 0.0 { 1.0 } else { h };
    body.transform.scale *= target_h / h;
}

/// Distance from the body's origin down to the bottom of its bounding box.
/// Adding this to a contact point puts the base exactly on that point.
pub fn base_offset(body: &DecorBody) -> f32 {
    body.transform.translation.y - body.world_bounds().min.y
}

/// Root transform that centers a freshly loaded surface on X/Z, puts its base
/// on y = 0 and shrinks oversized models.
pub fn normalize_surface(raw: &Bounds) -> Transform {
    let size = raw.size();
    let max_dim = size.x.max(size.y).max(size.z);
    let s = if max_dim > SURFACE_MAX_DIM { SURFACE_FIT_DIM / max_dim } else { 1.0 };
    let center = raw.center();
    Transform {
        translation: Vec3::new(-center.x * s, -raw.min.y * s, -center.z * s),
        scale: Vec3::splat(s),
        ..default()
    }
}
