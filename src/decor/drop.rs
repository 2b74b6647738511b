// src/decor/drop.rs
//! Surface drop: snap a body's Y onto the surface directly below it.

use bevy::math::Ray3d;
use bevy::prelude::*;

use super::core::{DecorBody, SurfaceCaster};
use super::geometry::base_offset;

/// Rays start this far above the apex.
pub const DROP_RAY_MARGIN: f32 = 5.0;

/// Rest `body` on `surface` below its current X/Z. Only Y is written.
///
/// With no hit (outside the footprint) the body rests on `apex`. With no
/// surface at all this is a no-op.
pub fn drop_onto_surface(body: &mut DecorBody, surface: Option<&dyn SurfaceCaster>, apex: f32) {
    let Some(surface) = surface else { return };

    let p = body.transform.translation;
    let ray = Ray3d::new(Vec3::new(p.x, apex + DROP_RAY_MARGIN, p.z), Dir3::NEG_Y);
    let rest_y = surface.nearest_hit(ray).map_or(apex, |hit| hit.point.y);

    let lift = base_offset(body);
    body.transform.translation.y = rest_y + lift;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::core::Bounds;
    use crate::surface::mesh::TriangleSurface;

    /// Two-level surface: a 2x2 plate at y=1 with a 0.5x0.5 bump at y=1.5.
    fn stepped_surface() -> TriangleSurface {
        let mut tris = TriangleSurface::quad_triangles(Vec3::new(-1.0, 1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        tris.extend(TriangleSurface::quad_triangles(
            Vec3::new(0.25, 1.5, 0.25),
            Vec3::new(0.75, 1.5, 0.75),
        ));
        TriangleSurface::from_triangles(tris)
    }

    fn body_at(x: f32, z: f32) -> DecorBody {
        DecorBody::new(
            Transform::from_xyz(x, 10.0, z),
            Bounds::new(Vec3::new(-0.05, -0.02, -0.05), Vec3::new(0.05, 0.2, 0.05)),
        )
    }

    #[test]
    fn test_drop_rests_on_nearest_hit() {
        let surface = stepped_surface();
        let mut body = body_at(0.6, 0.4);
        drop_onto_surface(&mut body, Some(&surface), 1.5);
        assert!((body.transform.translation.y - (1.5 + 0.02)).abs() < 1e-5);

        let mut body = body_at(-0.5, 0.3);
        drop_onto_surface(&mut body, Some(&surface), 1.5);
        assert!((body.transform.translation.y - (1.0 + 0.02)).abs() < 1e-5);
    }

    #[test]
    fn test_drop_outside_footprint_uses_apex() {
        let surface = TriangleSurface::from_triangles(TriangleSurface::quad_triangles(
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ));
        let mut body = body_at(4.0, 0.0);
        drop_onto_surface(&mut body, Some(&surface), 1.0);
        let expected = 1.0 + 0.02;
        assert!((body.transform.translation.y - expected).abs() < 1e-5);
        assert_eq!(body.transform.translation.x, 4.0);
    }

    #[test]
    fn test_drop_without_surface_is_noop() {
        let mut body = body_at(0.3, 0.1);
        let before = body.clone();
        drop_onto_surface(&mut body, None, 1.0);
        assert_eq!(body, before);
    }

    #[test]
    fn test_drop_is_idempotent() {
        let surface = stepped_surface();
        let mut body = body_at(0.1, -0.3);
        body.transform.scale = Vec3::splat(1.7);
        drop_onto_surface(&mut body, Some(&surface), 1.5);
        let once = body.transform.translation;
        drop_onto_surface(&mut body, Some(&surface), 1.5);
        assert!((body.transform.translation - once).length() < 1e-6);
    }
}
