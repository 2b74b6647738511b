use bevy::prelude::*;
use crate::input::CameraOrbit;

#[derive(Component)]
pub struct MainCamera;

/// Scene background.
pub const CLEAR_COLOR: Color = Color::srgb(0.078, 0.086, 0.102); // #14161a

pub fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // 1) Lights: key + fill, soft ambient
    commands.spawn((
        DirectionalLight {
            illuminance: 9_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(3.0, 6.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 2_500.0,
            color: Color::srgb(0.85, 0.9, 1.0),
            ..default()
        },
        Transform::from_xyz(-4.0, 3.0, -2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        ..default()
    });

    // 2) Ground
    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(20.0, 20.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.12, 0.13, 0.15),
            perceptual_roughness: 1.0,
            ..default()
        })),
        Transform::from_xyz(0.0, -0.001, 0.0),
    ));

    // 3) Camera
    let orbit = CameraOrbit {
        focus: Vec3::new(0.0, 0.3, 0.0),
        radius: 3.5,
        yaw: 0.6,
        pitch: 0.5,
    };
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(orbit.eye()).looking_at(orbit.focus, Vec3::Y),
        MainCamera,
        orbit,
    ));
}
