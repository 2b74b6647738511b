use bevy::prelude::*;
use std::collections::HashMap;

/// Editor actions bound to keys. Triggered on press, not while held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditAction {
    CycleSelection,
    ToggleMove,
    NudgeLeft,
    NudgeRight,
    NudgeForward,
    NudgeBackward,
    ScaleUp,
    ScaleDown,
}

impl EditAction {
    pub const ALL: [EditAction; 8] = [
        EditAction::CycleSelection,
        EditAction::ToggleMove,
        EditAction::NudgeLeft,
        EditAction::NudgeRight,
        EditAction::NudgeForward,
        EditAction::NudgeBackward,
        EditAction::ScaleUp,
        EditAction::ScaleDown,
    ];

    pub fn key(self) -> KeyCode {
        match self {
            EditAction::CycleSelection => KeyCode::Tab,
            EditAction::ToggleMove => KeyCode::KeyM,
            EditAction::NudgeLeft => KeyCode::ArrowLeft,
            EditAction::NudgeRight => KeyCode::ArrowRight,
            EditAction::NudgeForward => KeyCode::ArrowUp,
            EditAction::NudgeBackward => KeyCode::ArrowDown,
            EditAction::ScaleUp => KeyCode::Equal,
            EditAction::ScaleDown => KeyCode::Minus,
        }
    }

    /// Horizontal (dx, dz) direction for the nudge actions.
    pub fn nudge_dir(self) -> Option<Vec2> {
        match self {
            EditAction::NudgeLeft => Some(Vec2::new(-1.0, 0.0)),
            EditAction::NudgeRight => Some(Vec2::new(1.0, 0.0)),
            EditAction::NudgeForward => Some(Vec2::new(0.0, -1.0)),
            EditAction::NudgeBackward => Some(Vec2::new(0.0, 1.0)),
            _ => None,
        }
    }
}

#[derive(Default, Resource)]
pub struct ActionState {
    triggered: HashMap<EditAction, bool>,
}

impl ActionState {
    pub fn set(&mut self, action: EditAction, triggered: bool) {
        self.triggered.insert(action, triggered);
    }

    pub fn triggered(&self, action: EditAction) -> bool {
        *self.triggered.get(&action).unwrap_or(&false)
    }

    pub fn iter_triggered(&self) -> impl Iterator<Item = EditAction> + '_ {
        EditAction::ALL.into_iter().filter(|a| self.triggered(*a))
    }
}
