// src/surface/mesh.rs
//! Triangle soup surface: what decorations are dropped onto.

use bevy::math::Ray3d;
use bevy::prelude::*;
use bevy::render::mesh::{Indices, Mesh, PrimitiveTopology, VertexAttributeValues};

use crate::decor::core::{Bounds, SurfaceCaster, SurfaceHit};

/// CPU copy of one mesh's triangle data plus its transform relative to the
/// surface root. Cheap to move into an async task.
#[derive(Clone, Debug)]
pub struct MeshSnapshot {
    pub positions: Vec<[f32; 3]>,
    /// `None` for non-indexed meshes (every 3 positions form a triangle).
    pub indices: Option<Vec<u32>>,
    pub transform: Transform,
}

impl MeshSnapshot {
    /// Copy triangle data out of `mesh`. Returns `None` for non-triangle-list
    /// topologies or meshes without float3 positions.
    pub fn capture(mesh: &Mesh, transform: Transform) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }
        let Some(VertexAttributeValues::Float32x3(positions)) = mesh.attribute(Mesh::ATTRIBUTE_POSITION) else {
            return None;
        };
        let indices = mesh.indices().map(|ix| match ix {
            Indices::U16(v) => v.iter().map(|&i| i as u32).collect(),
            Indices::U32(v) => v.clone(),
        });
        Some(Self { positions: positions.clone(), indices, transform })
    }

    /// Triangles in root space. Out-of-range indices drop their triangle.
    pub fn triangles(&self) -> Vec<[Vec3; 3]> {
        let world: Vec<Vec3> = self
            .positions
            .iter()
            .map(|p| self.transform.transform_point(Vec3::from_array(*p)))
            .collect();

        let mut out = Vec::new();
        match &self.indices {
            Some(ix) => {
                for tri in ix.chunks_exact(3) {
                    let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
                    if let (Some(&a), Some(&b), Some(&c)) = (world.get(a), world.get(b), world.get(c)) {
                        out.push([a, b, c]);
                    }
                }
            }
            None => {
                for tri in world.chunks_exact(3) {
                    out.push([tri[0], tri[1], tri[2]]);
                }
            }
        }
        out
    }
}

/// Ray-castable triangle surface with cached bounds.
#[derive(Clone, Debug, Default)]
pub struct TriangleSurface {
    triangles: Vec<[Vec3; 3]>,
    bounds: Option<Bounds>,
}

impl TriangleSurface {
    pub fn from_triangles(triangles: Vec<[Vec3; 3]>) -> Self {
        let bounds = Bounds::from_points(triangles.iter().flatten().copied());
        Self { triangles, bounds }
    }

    pub fn from_snapshots(snapshots: &[MeshSnapshot]) -> Self {
        Self::from_triangles(snapshots.iter().flat_map(MeshSnapshot::triangles).collect())
    }

    /// Re-express every triangle under `transform` (e.g. after normalization).
    pub fn transformed(&self, transform: &Transform) -> Self {
        Self::from_triangles(
            self.triangles
                .iter()
                .map(|t| t.map(|v| transform.transform_point(v)))
                .collect(),
        )
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.triangles.len()
    }

    /// Two triangles covering the horizontal rectangle `min..max` at `min.y`.
    #[cfg(test)]
    pub(crate) fn quad_triangles(min: Vec3, max: Vec3) -> Vec<[Vec3; 3]> {
        let y = min.y;
        let a = Vec3::new(min.x, y, min.z);
        let b = Vec3::new(max.x, y, min.z);
        let c = Vec3::new(max.x, y, max.z);
        let d = Vec3::new(min.x, y, max.z);
        vec![[a, b, c], [a, c, d]]
    }
}

impl SurfaceCaster for TriangleSurface {
    fn cast_ray(&self, ray: Ray3d) -> Vec<SurfaceHit> {
        let mut hits: Vec<SurfaceHit> = self
            .triangles
            .iter()
            .filter_map(|[v0, v1, v2]| ray_triangle_intersect(&ray, *v0, *v1, *v2))
            .map(|t| SurfaceHit { distance: t, point: ray.get_point(t) })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}

/// Möller-Trumbore ray-triangle intersection, double-sided.
/// Returns the distance along the ray if hit.
pub fn ray_triangle_intersect(ray: &Ray3d, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;
    let dir: Vec3 = *ray.direction;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = dir.cross(edge2);
    let a = edge1.dot(h);

    // parallel
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * dir.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}
