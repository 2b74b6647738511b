// src/decor/builders.rs
//! Turn a `DecorDef` into something on screen, and into the `DecorBody` the
//! board places.

use bevy::gltf::{Gltf, GltfAssetLabel};
use bevy::prelude::*;

use super::board::DecorLoadError;
use super::core::{Bounds, DecorBody, DecorKey, MaterialTuning};
use super::geometry::fit_to_height;
use super::registry::{DecorDef, PartDef, ShapeDef};
use crate::surface::hierarchy::MeshNode;

/// Root of a decoration's visual.
#[derive(Component, Clone, Debug)]
pub struct DecorNode(pub DecorKey);

/// A glTF decoration still waiting for its scene instance.
#[derive(Component)]
pub struct PendingScene {
    pub path: String,
    /// Held to detect load failure.
    pub gltf: Handle<Gltf>,
}

/// Body for a freshly built decoration: yawed by the definition, scaled to its
/// fit height on a cake of `top_height`, not yet positioned.
pub fn initial_body(def: &DecorDef, local_bounds: Bounds, top_height: f32) -> DecorBody {
    let mut body = DecorBody::new(Transform::from_rotation(Quat::from_rotation_y(def.rotation_y)), local_bounds);
    if let Some(target) = def.target_height(top_height) {
        fit_to_height(&mut body, target);
    }
    body
}

/// Bounds of a procedural decoration, or `EmptyGeometry` if it has no parts.
pub fn parts_body(def: &DecorDef, top_height: f32) -> Result<DecorBody, DecorLoadError> {
    let bounds = def
        .render
        .parts_bounds()
        .ok_or_else(|| DecorLoadError::EmptyGeometry { path: def.name.clone() })?;
    Ok(initial_body(def, bounds, top_height))
}

pub fn shape_mesh(shape: &ShapeDef) -> Mesh {
    match *shape {
        ShapeDef::Sphere { radius } => Sphere::new(radius).mesh().uv(24, 16),
        ShapeDef::Cone { radius, height } => Mesh::from(Cone { radius, height }),
        ShapeDef::Cylinder { radius, height } => Mesh::from(Cylinder::new(radius, height)),
        ShapeDef::Cuboid { size } => Mesh::from(Cuboid::from_size(size)),
    }
}

fn part_material(part: &PartDef, fallback: MaterialTuning) -> StandardMaterial {
    let [r, g, b] = part.color;
    let mut mat = StandardMaterial { base_color: Color::srgb(r, g, b), ..default() };
    part.tuning.unwrap_or(fallback).apply(&mut mat);
    mat
}

/// Spawn a procedural decoration: a root with one child per part. Hidden
/// until the board has placed it.
pub fn spawn_parts(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    def: &DecorDef,
    parts: &[PartDef],
) -> Entity {
    commands
        .spawn((
            DecorNode(def.key()),
            Transform::default(),
            Visibility::Hidden,
            Name::new(def.name.clone()),
        ))
        .with_children(|root| {
            for part in parts {
                root.spawn((
                    Mesh3d(meshes.add(shape_mesh(&part.shape))),
                    MeshMaterial3d(materials.add(part_material(part, def.tuning))),
                    part.transform(),
                ));
            }
        })
        .id()
}

/// Spawn a glTF decoration, hidden, tagged `PendingScene` until it is ready.
pub fn spawn_scene(commands: &mut Commands, assets: &AssetServer, def: &DecorDef, path: &str) -> Entity {
    let scene = assets.load(GltfAssetLabel::Scene(0).from_asset(path.to_string()));
    let gltf: Handle<Gltf> = assets.load(path.to_string());
    commands
        .spawn((
            DecorNode(def.key()),
            SceneRoot(scene),
            Transform::default(),
            Visibility::Hidden,
            Name::new(def.name.clone()),
            PendingScene { path: path.to_string(), gltf },
        ))
        .id()
}

/// Give every mesh under a decoration its own tuned copy of its material.
/// Copies so that scenes sharing a material asset aren't affected.
pub fn retune_materials(
    nodes: &[MeshNode],
    handles: &mut Query<&mut MeshMaterial3d<StandardMaterial>>,
    materials: &mut Assets<StandardMaterial>,
    tuning: MaterialTuning,
) -> usize {
    let mut tuned = 0;
    for node in nodes {
        let Ok(mut handle) = handles.get_mut(node.entity) else { continue };
        let Some(mut mat) = materials.get(&handle.0).cloned() else { continue };
        tuning.apply(&mut mat);
        handle.0 = materials.add(mat);
        tuned += 1;
    }
    tuned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::registry::DecorRender;

    fn def(render: DecorRender, fit_height: Option<f32>) -> DecorDef {
        DecorDef {
            name: "strawberry".into(),
            render,
            fit_height,
            rotation_y: 0.0,
            tuning: MaterialTuning::default(),
        }
    }

    fn berry() -> DecorRender {
        DecorRender::Parts {
            parts: vec![PartDef {
                shape: ShapeDef::Sphere { radius: 0.08 },
                offset: Vec3::new(0.0, 0.08, 0.0),
                rotation_x: 0.0,
                rotation_y: 0.0,
                color: [0.85, 0.1, 0.15],
                tuning: None,
            }],
        }
    }

    #[test]
    fn test_parts_body_native_size() {
        let body = parts_body(&def(berry(), None), 0.6).unwrap();
        let b = body.world_bounds();
        assert!((b.height() - 0.16).abs() < 1e-6);
        assert!(b.min.y.abs() < 1e-6);
    }

    #[test]
    fn test_parts_body_fitted() {
        // top 2.0, fraction 0.2 -> 0.4 tall
        let body = parts_body(&def(berry(), Some(0.2)), 2.0).unwrap();
        assert!((body.world_bounds().height() - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_empty_parts() {
        let d = def(DecorRender::Parts { parts: vec![] }, None);
        assert_eq!(
            parts_body(&d, 1.0),
            Err(DecorLoadError::EmptyGeometry { path: "strawberry".into() })
        );
    }

    #[test]
    fn test_initial_body_yaw() {
        let mut d = def(berry(), None);
        d.rotation_y = std::f32::consts::FRAC_PI_2;
        let wide = Bounds::new(Vec3::new(-1.0, 0.0, -0.1), Vec3::new(1.0, 0.5, 0.1));
        let body = initial_body(&d, wide, 1.0);
        assert!((body.world_bounds().size().z - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_part_material_override() {
        let part = PartDef {
            shape: ShapeDef::Sphere { radius: 0.02 },
            offset: Vec3::ZERO,
            rotation_x: 0.0,
            rotation_y: 0.0,
            color: [1.0, 0.84, 0.31],
            tuning: Some(MaterialTuning::Unlit),
        };
        assert!(part_material(&part, MaterialTuning::default()).unlit);
    }
}
