// src/surface/hierarchy.rs
//! Walk a spawned model's hierarchy and collect its meshes relative to the root.
//!
//! Transforms are composed by hand from local `Transform`s so this works the
//! same frame a scene is spawned, before `GlobalTransform` propagation.

use bevy::prelude::*;
use bevy::render::mesh::{Mesh, MeshAabb};

use crate::decor::core::Bounds;

/// Fires once a spawned scene's entities exist.
#[derive(Component)]
pub struct SceneReady;

/// Global observer: mark any scene root whose instance finished spawning.
pub fn mark_scene_ready(trigger: Trigger<bevy::scene::SceneInstanceReady>, mut commands: Commands) {
    if let Ok(mut ec) = commands.get_entity(trigger.target()) {
        ec.insert(SceneReady);
    }
}

/// One mesh under a root: its entity, transform relative to the root, and mesh handle.
pub struct MeshNode {
    pub entity: Entity,
    pub to_root: Transform,
    pub mesh: Handle<Mesh>,
}

/// Every mesh at or below `root`. The root's own transform is not applied.
pub fn mesh_nodes(
    root: Entity,
    children_q: &Query<&Children>,
    nodes_q: &Query<(&Transform, Option<&Mesh3d>)>,
) -> Vec<MeshNode> {
    let mut out = Vec::new();
    let mut stack = vec![(root, Transform::IDENTITY)];
    while let Some((entity, to_root)) = stack.pop() {
        if let Ok((_, Some(mesh))) = nodes_q.get(entity) {
            out.push(MeshNode { entity, to_root, mesh: mesh.0.clone() });
        }
        let Ok(children) = children_q.get(entity) else { continue };
        for child in children.iter() {
            if let Ok((local, _)) = nodes_q.get(child) {
                stack.push((child, to_root.mul_transform(*local)));
            }
        }
    }
    out
}

/// Union of the mesh AABBs below `root`, in root space.
pub fn measure_bounds(nodes: &[MeshNode], meshes: &Assets<Mesh>) -> Option<Bounds> {
    nodes
        .iter()
        .filter_map(|n| {
            let aabb = meshes.get(&n.mesh)?.compute_aabb()?;
            let local = Bounds::from_center_half(Vec3::from(aabb.center), Vec3::from(aabb.half_extents));
            Some(local.transformed(&n.to_root))
        })
        .reduce(|a, b| a.union(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_bounds_unions_nodes() {
        let mut meshes = Assets::<Mesh>::default();
        let cube = meshes.add(Cuboid::new(1.0, 1.0, 1.0));
        let nodes = vec![
            MeshNode { entity: Entity::PLACEHOLDER, to_root: Transform::IDENTITY, mesh: cube.clone() },
            MeshNode {
                entity: Entity::PLACEHOLDER,
                to_root: Transform::from_xyz(2.0, 1.0, 0.0).with_scale(Vec3::splat(2.0)),
                mesh: cube,
            },
        ];
        let b = measure_bounds(&nodes, &meshes).unwrap();
        assert!((b.min - Vec3::splat(-0.5)).length() < 1e-5);
        assert!((b.max - Vec3::new(3.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_measure_bounds_missing_mesh() {
        let meshes = Assets::<Mesh>::default();
        let nodes = vec![MeshNode { entity: Entity::PLACEHOLDER, to_root: Transform::IDENTITY, mesh: Handle::default() }];
        assert!(measure_bounds(&nodes, &meshes).is_none());
    }
}
