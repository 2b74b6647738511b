use bevy::prelude::*;

mod setup;
mod input;
mod actions;
mod settings;
mod ui;
mod decor;
mod surface;

// re-export the bits we actually need in main
use actions::ActionState;
use decor::DecorPlugin;
use input::{camera_controller, drag_move_system, edit_action_system, focus_on_surface, input_mapping_system};
use settings::{DecorSettings, SETTINGS_PATH};
use surface::SurfacePlugin;
use ui::EditorUiPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Cake Decorator".into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(ClearColor(setup::CLEAR_COLOR))
        // after DefaultPlugins so the load is logged; before the plugins that
        // size the board from it
        .insert_resource(DecorSettings::load_or_default(SETTINGS_PATH))
        .add_plugins(SurfacePlugin)   // loads + normalizes the cake
        .add_plugins(DecorPlugin)     // registry, board, decoration visuals
        .add_plugins(EditorUiPlugin)  // toggles, edit panel, toast
        .init_resource::<ActionState>()
        // camera, lights, ground
        .add_systems(Startup, setup::setup)
        // input + camera each frame
        .add_systems(
            Update,
            (
                input_mapping_system,
                edit_action_system.after(input_mapping_system),
                drag_move_system,
                focus_on_surface,
                camera_controller.after(focus_on_surface),
            ),
        )
        .run();
}
