// src/settings.rs
//! Editor configuration: defaults, optionally overridden by a RON file.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk override, relative to the working directory.
pub const SETTINGS_PATH: &str = "assets/config/decor.settings.ron";

/// Where the cake comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SurfaceSource {
    /// glTF file (scene 0), relative to `assets/`.
    Scene { path: String },
    /// Procedural stand-in: a plain cylinder.
    Cylinder { radius: f32, height: f32 },
}

#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecorSettings {
    /// Decoration registry manifest (asset path).
    pub registry_path: String,
    pub surface: SurfaceSource,
    /// Attachment points around the cake top.
    pub slot_count: usize,
    /// Decorations allowed on the cake at once. Must not exceed `slot_count`.
    pub max_items: usize,
    /// Fixed jitter seed; `None` draws a fresh one each run.
    pub seed: Option<u64>,
}

impl Default for DecorSettings {
    fn default() -> Self {
        Self {
            registry_path: "decor/cake.decor.ron".to_string(),
            surface: SurfaceSource::Cylinder { radius: 1.0, height: 0.6 },
            slot_count: 6,
            max_items: 3,
            seed: None,
        }
    }
}

impl DecorSettings {
    pub fn from_ron(src: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::de::from_str(src).map_err(|e| SettingsError::Ron(e.to_string()))?;
        Ok(settings.validated())
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let src = std::fs::read_to_string(path)?;
        Self::from_ron(&src)
    }

    /// Read `path` if it exists; fall back to defaults on a missing or bad file.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            info!("Settings: '{}' not found, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(s) => {
                info!("Settings: loaded '{}'", path.display());
                s
            }
            Err(e) => {
                warn!("Settings: ignoring '{}': {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Enforce `max_items <= slot_count` and at least one slot.
    pub fn validated(mut self) -> Self {
        if self.slot_count == 0 {
            warn!("Settings: slot_count 0 is unusable, using 1");
            self.slot_count = 1;
        }
        if self.max_items > self.slot_count {
            warn!(
                "Settings: max_items {} exceeds slot_count {}, clamping",
                self.max_items, self.slot_count
            );
            self.max_items = self.slot_count;
        }
        self
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("I/O while reading settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let s = DecorSettings::from_ron("(max_items: 6, seed: Some(7))").unwrap();
        assert_eq!(s.max_items, 6);
        assert_eq!(s.seed, Some(7));
        assert_eq!(s.slot_count, 6);
        assert_eq!(s.registry_path, DecorSettings::default().registry_path);
    }

    #[test]
    fn test_scene_surface() {
        let s = DecorSettings::from_ron(r#"(surface: Scene(path: "models/cake.glb"))"#).unwrap();
        assert_eq!(s.surface, SurfaceSource::Scene { path: "models/cake.glb".into() });
    }

    #[test]
    fn test_max_items_clamped() {
        let s = DecorSettings::from_ron("(slot_count: 4, max_items: 9)").unwrap();
        assert_eq!(s.max_items, 4);
    }

    #[test]
    fn test_bad_ron() {
        assert!(matches!(DecorSettings::from_ron("(slot_count: \"six\")"), Err(SettingsError::Ron(_))));
    }

    #[test]
    fn test_shipped_settings_match_defaults() {
        let s = DecorSettings::from_ron(include_str!("../assets/config/decor.settings.ron")).unwrap();
        assert_eq!(s, DecorSettings::default());
    }

    #[test]
    fn test_missing_file_defaults() {
        let s = DecorSettings::load_or_default("does/not/exist.ron");
        assert_eq!(s, DecorSettings::default());
    }
}
