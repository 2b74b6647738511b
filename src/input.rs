use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::input::{mouse::MouseMotion, keyboard::KeyCode, ButtonInput};
use bevy::window::PrimaryWindow;

use crate::actions::{ActionState, EditAction};
use crate::decor::plugin::{NUDGE_STEP, SCALE_STEP};
use crate::decor::{DecorBoard, DecorCommand};
use crate::setup::MainCamera;
use crate::surface::SurfaceReady;

pub const ROTATE_SPEED: f32 = 0.2;
pub const MAX_CAMERA_DT: f32 = 0.05; // never use a dt larger than 50ms
pub const MIN_RADIUS: f32 = 1.5;
pub const MAX_RADIUS: f32 = 8.0;
/// Lowest elevation: the camera stays at or above 0.49π from straight down.
pub const MIN_PITCH: f32 = std::f32::consts::PI * 0.01;
pub const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

#[derive(Component)]
pub struct CameraOrbit {
    pub focus: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl CameraOrbit {
    /// Camera position for the current orbit.
    pub fn eye(&self) -> Vec3 {
        let xz_radius = self.radius * self.pitch.cos();
        self.focus
            + Vec3::new(
                xz_radius * self.yaw.cos(),
                self.radius * self.pitch.sin(),
                xz_radius * self.yaw.sin(),
            )
    }
}

pub fn input_mapping_system(
    keys: Res<ButtonInput<KeyCode>>,
    mut action_state: ResMut<ActionState>,
) {
    for action in EditAction::ALL {
        action_state.set(action, keys.just_pressed(action.key()));
    }
}

/// Turn triggered edit actions into board commands.
pub fn edit_action_system(
    action_state: Res<ActionState>,
    mut commands: EventWriter<DecorCommand>,
) {
    for action in action_state.iter_triggered() {
        let cmd = match action {
            EditAction::CycleSelection => DecorCommand::CycleSelection,
            EditAction::ToggleMove => DecorCommand::ToggleMove,
            EditAction::ScaleUp => DecorCommand::Rescale(SCALE_STEP),
            EditAction::ScaleDown => DecorCommand::Rescale(1.0 / SCALE_STEP),
            nudge => match nudge.nudge_dir() {
                Some(dir) => DecorCommand::Nudge(dir * NUDGE_STEP),
                None => continue,
            },
        };
        commands.write(cmd);
    }
}

/// Point the orbit at the cake once it is loaded.
pub fn focus_on_surface(
    mut ready: EventReader<SurfaceReady>,
    mut query: Query<&mut CameraOrbit, With<MainCamera>>,
) {
    for SurfaceReady(metrics) in ready.read() {
        let Ok(mut orbit) = query.single_mut() else { return };
        orbit.focus = Vec3::new(0.0, metrics.top_height * 0.5, 0.0);
        debug!("Camera: focus at {:?}", orbit.focus);
    }
}

pub fn camera_controller(
    time: Res<Time>,
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mut motion_evr: EventReader<MouseMotion>,
    mut scroll_evr: EventReader<MouseWheel>,
    mut query: Query<(&mut Transform, &mut CameraOrbit), With<MainCamera>>,
) {
    // 0) Clamp delta
    let dt = time.delta_secs().min(MAX_CAMERA_DT);

    let Ok((mut tf, mut orbit)) = query.single_mut() else { return; };

    // 1) Zoom
    for ev in scroll_evr.read() {
        let amount = match ev.unit {
            MouseScrollUnit::Line => ev.y * 0.25,
            MouseScrollUnit::Pixel => ev.y * 0.005,
        };
        orbit.radius = (orbit.radius - amount).clamp(MIN_RADIUS, MAX_RADIUS);
    }

    // 2) Orbit
    let orbiting = mouse_buttons.pressed(MouseButton::Middle);
    for ev in motion_evr.read() {
        if orbiting {
            orbit.yaw += ev.delta.x * ROTATE_SPEED * dt;
            orbit.pitch += ev.delta.y * ROTATE_SPEED * dt;
        }
    }
    orbit.pitch = orbit.pitch.clamp(MIN_PITCH, MAX_PITCH);

    // 3) Position camera
    tf.translation = orbit.eye();
    tf.look_at(orbit.focus, Vec3::Y);
}

/// Left-drag moves the handle-bound decoration across the horizontal plane
/// at its current height. Ignored while the pointer is over a button.
pub fn drag_move_system(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    buttons: Query<&Interaction, With<Button>>,
    board: Res<DecorBoard>,
    mut commands: EventWriter<DecorCommand>,
) {
    if !mouse_buttons.pressed(MouseButton::Left) {
        return;
    }
    if buttons.iter().any(|i| *i != Interaction::None) {
        return;
    }
    let Some(body) = board.handle().and_then(|key| board.body(key)) else { return };
    let Ok(window) = windows.single() else { return };
    let Some(cursor) = window.cursor_position() else { return };
    let Ok((camera, cam_tf)) = cameras.single() else { return };
    let Ok(ray) = camera.viewport_to_world(cam_tf, cursor) else { return };

    let plane_y = body.position().y;
    let Some(p) = drag_point(ray, plane_y) else { return };
    if (p - Vec2::new(body.position().x, body.position().z)).length_squared() > 1e-8 {
        commands.write(DecorCommand::MoveTo(p));
    }
}

/// Where `ray` crosses the horizontal plane y = `plane_y`, as (x, z).
pub fn drag_point(ray: Ray3d, plane_y: f32) -> Option<Vec2> {
    let t = ray.intersect_plane(Vec3::new(0.0, plane_y, 0.0), InfinitePlane3d::new(Vec3::Y))?;
    let p = ray.get_point(t);
    Some(Vec2::new(p.x, p.z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drag_point() {
        let ray = Ray3d::new(Vec3::new(1.0, 3.0, 1.0), Dir3::new(Vec3::new(0.0, -1.0, 1.0)).unwrap());
        let p = drag_point(ray, 1.0).unwrap();
        assert!((p.x - 1.0).abs() < 1e-5);
        assert!((p.y - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_drag_point_parallel() {
        assert!(drag_point(Ray3d::new(Vec3::Y, Dir3::X), 0.0).is_none());
    }

    #[test]
    fn test_eye_above_focus() {
        let orbit = CameraOrbit { focus: Vec3::new(0.0, 0.3, 0.0), radius: 4.0, yaw: 0.0, pitch: MAX_PITCH };
        let eye = orbit.eye();
        assert!(eye.y > 4.0);
        assert!(((eye - orbit.focus).length() - 4.0).abs() < 1e-4);
    }
}
