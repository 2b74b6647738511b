//! On-screen controls: one toggle per decoration, the edit panel, a controls
//! hint and a toast.

use bevy::prelude::*;
use bevy::ui::BackgroundColor;

use crate::decor::plugin::SCALE_STEP;
use crate::decor::{DecorBoard, DecorCommand, DecorKey, DecorNotice};

/// How long a notice stays up.
pub const TOAST_SECS: f32 = 1.2;

/// Bottom-right controls hint.
pub const HELP_TEXT: &str = "Buttons: add / remove decorations\n\
Tab: select next  |  M: move on/off\n\
Arrows: nudge  |  - / =: scale\n\
Left drag: move  |  Middle drag: orbit  |  Wheel: zoom";

const BUTTON_IDLE: Color = Color::srgba(0.2, 0.22, 0.26, 0.9);
const BUTTON_HOVER: Color = Color::srgba(0.3, 0.33, 0.38, 0.95);
const BUTTON_PRESSED: Color = Color::srgba(0.45, 0.35, 0.25, 1.0);

/// Column holding the decoration toggles.
#[derive(Component)]
pub struct DecorButtonPanel;

#[derive(Component)]
pub struct DecorButton(pub DecorKey);

/// Text child of a `DecorButton`.
#[derive(Component)]
pub struct DecorButtonLabel(pub DecorKey);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditButton {
    Select,
    ScaleDown,
    ScaleUp,
    Move,
}

impl EditButton {
    fn command(self) -> DecorCommand {
        match self {
            EditButton::Select => DecorCommand::CycleSelection,
            EditButton::ScaleDown => DecorCommand::Rescale(1.0 / SCALE_STEP),
            EditButton::ScaleUp => DecorCommand::Rescale(SCALE_STEP),
            EditButton::Move => DecorCommand::ToggleMove,
        }
    }

    fn label(self, moving: bool) -> &'static str {
        match self {
            EditButton::Select => "Select",
            EditButton::ScaleDown => "Scale -",
            EditButton::ScaleUp => "Scale +",
            EditButton::Move if moving => "Disable Move",
            EditButton::Move => "Enable Move",
        }
    }
}

/// Text child of an `EditButton`.
#[derive(Component)]
pub struct EditButtonLabel(pub EditButton);

#[derive(Component)]
pub struct ToastText;

#[derive(Resource)]
pub struct Toast {
    pub timer: Timer,
}

impl Default for Toast {
    fn default() -> Self {
        let mut timer = Timer::from_seconds(TOAST_SECS, TimerMode::Once);
        timer.tick(timer.duration());
        Self { timer }
    }
}

pub struct EditorUiPlugin;

impl Plugin for EditorUiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Toast>()
            .add_systems(Startup, spawn_editor_ui)
            .add_systems(Update, spawn_decor_buttons)
            .add_systems(Update, (decor_button_system, edit_button_system).after(spawn_decor_buttons))
            .add_systems(Update, button_colors)
            .add_systems(Update, refresh_button_labels)
            .add_systems(Update, toast_system);
    }
}

fn button_bundle() -> (Button, Node, BackgroundColor) {
    (
        Button,
        Node {
            padding: UiRect::axes(Val::Px(12.0), Val::Px(6.0)),
            margin: UiRect::all(Val::Px(3.0)),
            justify_content: JustifyContent::Center,
            ..default()
        },
        BackgroundColor(BUTTON_IDLE),
    )
}

fn label_text(text: impl Into<String>) -> (Text, TextFont, TextColor) {
    (
        Text::new(text),
        TextFont { font_size: 16.0, ..default() },
        TextColor(Color::WHITE),
    )
}

pub fn spawn_editor_ui(mut commands: Commands) {
    // Left column: decoration toggles (filled once the registry is in)
    commands.spawn((
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            flex_direction: FlexDirection::Column,
            ..default()
        },
        DecorButtonPanel,
    ));

    // Bottom-left: edit panel
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            bottom: Val::Px(12.0),
            flex_direction: FlexDirection::Row,
            ..default()
        })
        .with_children(|panel| {
            for b in [EditButton::Select, EditButton::ScaleDown, EditButton::ScaleUp, EditButton::Move] {
                panel.spawn((button_bundle(), b)).with_children(|btn| {
                    btn.spawn((label_text(b.label(false)), EditButtonLabel(b)));
                });
            }
        });

    // Bottom-right: controls
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(12.0),
                bottom: Val::Px(12.0),
                padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.5)),
            BorderRadius::all(Val::Px(8.0)),
        ))
        .with_children(|help| {
            help.spawn((
                Text::new(HELP_TEXT),
                TextFont { font_size: 12.0, ..default() },
                TextColor(Color::srgb_u8(0xe8, 0xe8, 0xe8)),
            ));
        });

    // Bottom-centre: toast
    commands
        .spawn(Node {
            position_type: PositionType::Absolute,
            width: Val::Percent(100.0),
            bottom: Val::Px(64.0),
            justify_content: JustifyContent::Center,
            ..default()
        })
        .with_children(|row| {
            row.spawn((
                Text::new(""),
                TextFont { font_size: 20.0, ..default() },
                TextLayout::new_with_justify(JustifyText::Center),
                TextColor(Color::WHITE),
                Visibility::Hidden,
                ToastText,
            ));
        });
}

/// Add a toggle for every registered decoration that doesn't have one yet.
fn spawn_decor_buttons(
    mut commands: Commands,
    board: Res<DecorBoard>,
    panel: Query<Entity, With<DecorButtonPanel>>,
    existing: Query<&DecorButton>,
) {
    if !board.is_changed() {
        return;
    }
    let Ok(panel) = panel.single() else { return };
    for key in board.keys() {
        if existing.iter().any(|b| &b.0 == key) {
            continue;
        }
        let label = board.button_label(key);
        commands.entity(panel).with_children(|col| {
            col.spawn((button_bundle(), DecorButton(key.clone()))).with_children(|btn| {
                btn.spawn((label_text(label), DecorButtonLabel(key.clone())));
            });
        });
    }
}

fn decor_button_system(
    buttons: Query<(&Interaction, &DecorButton), Changed<Interaction>>,
    mut commands: EventWriter<DecorCommand>,
) {
    for (interaction, DecorButton(key)) in &buttons {
        if *interaction == Interaction::Pressed {
            commands.write(DecorCommand::Toggle(key.clone()));
        }
    }
}

fn edit_button_system(
    buttons: Query<(&Interaction, &EditButton), Changed<Interaction>>,
    mut commands: EventWriter<DecorCommand>,
) {
    for (interaction, button) in &buttons {
        if *interaction == Interaction::Pressed {
            commands.write(button.command());
        }
    }
}

fn button_colors(mut buttons: Query<(&Interaction, &mut BackgroundColor), (Changed<Interaction>, With<Button>)>) {
    for (interaction, mut bg) in &mut buttons {
        bg.0 = match interaction {
            Interaction::Pressed => BUTTON_PRESSED,
            Interaction::Hovered => BUTTON_HOVER,
            Interaction::None => BUTTON_IDLE,
        };
    }
}

fn refresh_button_labels(
    board: Res<DecorBoard>,
    mut decor_labels: Query<(&DecorButtonLabel, &mut Text), Without<EditButtonLabel>>,
    mut edit_labels: Query<(&EditButtonLabel, &mut Text), Without<DecorButtonLabel>>,
) {
    if !board.is_changed() {
        return;
    }
    for (DecorButtonLabel(key), mut text) in &mut decor_labels {
        let label = board.button_label(key);
        if text.0 != label {
            text.0 = label;
        }
    }
    let moving = board.handle().is_some();
    for (EditButtonLabel(b), mut text) in &mut edit_labels {
        let label = b.label(moving);
        if text.0 != label {
            text.0 = label.to_string();
        }
    }
}

fn toast_system(
    time: Res<Time>,
    mut toast: ResMut<Toast>,
    mut notices: EventReader<DecorNotice>,
    mut toast_text: Query<(&mut Text, &mut Visibility), With<ToastText>>,
) {
    let Ok((mut text, mut vis)) = toast_text.single_mut() else { return };
    if let Some(DecorNotice(msg)) = notices.read().last() {
        text.0 = msg.clone();
        *vis = Visibility::Inherited;
        toast.timer.reset();
        return;
    }
    if toast.timer.tick(time.delta()).just_finished() {
        *vis = Visibility::Hidden;
    }
}
