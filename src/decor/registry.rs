// src/decor/registry.rs
//! Data-driven decoration definitions + loader.

use bevy::asset::{io::Reader, AssetLoader, LoadContext};
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::core::{Bounds, DecorKey, MaterialTuning};

// ---------- Public plugin to register asset+loader ----------

pub struct DecorRegistryAssetPlugin;

impl Plugin for DecorRegistryAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<DecorRegistry>()
            .register_asset_loader(DecorRegistryLoader);
    }
}

// ---------- Shapes (data form) ----------

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShapeDef {
    Sphere { radius: f32 },
    /// Apex points up (+Y), centered on its mid-height.
    Cone { radius: f32, height: f32 },
    Cylinder { radius: f32, height: f32 },
    Cuboid { size: Vec3 },
}

impl ShapeDef {
    /// Bounds in the shape's own space (all shapes are centered on the origin).
    pub fn local_bounds(&self) -> Bounds {
        let half = match *self {
            ShapeDef::Sphere { radius } => Vec3::splat(radius),
            ShapeDef::Cone { radius, height } | ShapeDef::Cylinder { radius, height } => {
                Vec3::new(radius, height * 0.5, radius)
            }
            ShapeDef::Cuboid { size } => size * 0.5,
        };
        Bounds::from_center_half(Vec3::ZERO, half)
    }
}

/// One primitive piece of a procedural decoration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartDef {
    pub shape: ShapeDef,
    #[serde(default)]
    pub offset: Vec3,
    #[serde(default)]
    pub rotation_x: f32,
    #[serde(default)]
    pub rotation_y: f32,
    /// sRGB color, 0..1 per channel.
    pub color: [f32; 3],
    /// Overrides the decoration-level tuning for this part.
    #[serde(default)]
    pub tuning: Option<MaterialTuning>,
}

impl PartDef {
    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.offset).with_rotation(
            Quat::from_rotation_y(self.rotation_y) * Quat::from_rotation_x(self.rotation_x),
        )
    }
}

// ---------- Render refs (data form) ----------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DecorRender {
    /// Built from primitives; available immediately.
    Parts { parts: Vec<PartDef> },
    /// glTF file (scene 0), loaded through the asset server.
    Scene { path: String },
}

impl DecorRender {
    /// Combined bounds of all parts, in the decoration's own space.
    /// `None` for scenes (measured after spawn) or empty part lists.
    pub fn parts_bounds(&self) -> Option<Bounds> {
        let DecorRender::Parts { parts } = self else { return None };
        parts
            .iter()
            .map(|p| p.shape.local_bounds().transformed(&p.transform()))
            .reduce(|a, b| a.union(&b))
    }
}

// ---------- Decoration definition (data form) ----------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecorDef {
    /// Unique key (used for lookup and as the button label).
    pub name: String,

    /// Visual representation.
    pub render: DecorRender,

    /// Target height as a fraction of the cake's top height; `None` keeps the
    /// model's own size.
    #[serde(default)]
    pub fit_height: Option<f32>,

    /// Initial yaw (radians).
    #[serde(default)]
    pub rotation_y: f32,

    #[serde(default)]
    pub tuning: MaterialTuning,
}

impl DecorDef {
    pub fn key(&self) -> DecorKey {
        DecorKey::new(self.name.clone())
    }

    /// Height to fit to on a cake whose top sits at `top_height`.
    /// Small cakes still get at least `fraction` units.
    pub fn target_height(&self, top_height: f32) -> Option<f32> {
        let fraction = self.fit_height?;
        let top = if top_height > 0.0 { top_height } else { 1.0 };
        Some(fraction.max(top * fraction))
    }
}

// ---------- Runtime registry asset ----------

#[derive(Asset, TypePath, Clone, Debug)]
pub struct DecorRegistry {
    /// Ordered list; drives button order.
    pub decorations: Vec<DecorDef>,
    /// Name → index for quick lookups.
    pub name_to_index: HashMap<String, usize>,
}

impl DecorRegistry {
    /// Build from definitions, rejecting duplicate names.
    pub fn from_defs(defs: Vec<DecorDef>) -> Result<Self, DecorRegistryLoadError> {
        let mut name_to_index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            if let Some(prev) = name_to_index.insert(def.name.clone(), i) {
                return Err(DecorRegistryLoadError::DuplicateName {
                    name: def.name.clone(),
                    first: prev,
                    second: i,
                });
            }
        }
        Ok(Self { decorations: defs, name_to_index })
    }

    pub fn get(&self, key: &DecorKey) -> Option<&DecorDef> {
        self.name_to_index.get(key.as_str()).and_then(|&i| self.decorations.get(i))
    }
}

// ---------- Asset loader for `.decor.ron` ----------

#[derive(Default)]
pub struct DecorRegistryLoader;

impl AssetLoader for DecorRegistryLoader {
    type Asset = DecorRegistry;
    type Settings = ();
    type Error = DecorRegistryLoadError;

    fn extensions(&self) -> &[&str] {
        &["decor.ron"]
    }

    async fn load(
        &self,
        reader: &mut dyn Reader,
        _settings: &Self::Settings,
        _load_context: &mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;
        let defs: Vec<DecorDef> =
            ron::de::from_bytes(&bytes).map_err(|e| DecorRegistryLoadError::Ron(e.to_string()))?;
        DecorRegistry::from_defs(defs)
    }
}

// ---------- Loader errors ----------

#[derive(thiserror::Error, Debug)]
pub enum DecorRegistryLoadError {
    #[error("I/O while reading registry: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(String),
    #[error("Duplicate decoration name '{name}' (first idx {first}, second idx {second})")]
    DuplicateName { name: String, first: usize, second: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        (
            name: "candle",
            render: Parts(parts: [
                (shape: Cylinder(radius: 0.02, height: 0.25), offset: (0.0, 0.125, 0.0), color: (0.96, 0.96, 0.96)),
                (shape: Sphere(radius: 0.02), offset: (0.0, 0.27, 0.0), color: (1.0, 0.84, 0.31), tuning: Some(Unlit)),
            ]),
        ),
        (
            name: "orchid",
            render: Scene(path: "models/orchid_flower.glb"),
            fit_height: Some(0.35),
            rotation_y: 0.3927,
            tuning: Matte(roughness: 0.5, metalness: 0.0),
        ),
    ]"#;

    fn parse(src: &str) -> Result<DecorRegistry, DecorRegistryLoadError> {
        let defs: Vec<DecorDef> = ron::de::from_str(src).map_err(|e| DecorRegistryLoadError::Ron(e.to_string()))?;
        DecorRegistry::from_defs(defs)
    }

    #[test]
    fn test_parse_registry() {
        let reg = parse(SAMPLE).unwrap();
        assert_eq!(reg.decorations.len(), 2);
        let orchid = reg.get(&"orchid".into()).unwrap();
        assert!(matches!(orchid.render, DecorRender::Scene { .. }));
        assert_eq!(orchid.tuning, MaterialTuning::Matte { roughness: 0.5, metalness: 0.0 });
        assert!(reg.get(&"cake".into()).is_none());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let defs = vec![
            DecorDef {
                name: "a".into(),
                render: DecorRender::Scene { path: "a.glb".into() },
                fit_height: None,
                rotation_y: 0.0,
                tuning: MaterialTuning::Unlit,
            };
            2
        ];
        let err = DecorRegistry::from_defs(defs).unwrap_err();
        assert!(matches!(err, DecorRegistryLoadError::DuplicateName { first: 0, second: 1, .. }));
    }

    #[test]
    fn test_parts_bounds() {
        let reg = parse(SAMPLE).unwrap();
        let candle = reg.get(&"candle".into()).unwrap();
        let b = candle.render.parts_bounds().unwrap();
        assert!(b.min.y.abs() < 1e-6);
        assert!((b.max.y - 0.29).abs() < 1e-6);
        assert!((b.size().x - 0.04).abs() < 1e-6);
    }

    #[test]
    fn test_shipped_registry_parses() {
        let reg = parse(include_str!("../../assets/decor/cake.decor.ron")).unwrap();
        let names: Vec<_> = reg.decorations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["strawberry", "candle", "chocolate"]);
        for def in &reg.decorations {
            assert!(def.render.parts_bounds().is_some(), "{} has no parts", def.name);
        }
    }

    #[test]
    fn test_target_height() {
        let reg = parse(SAMPLE).unwrap();
        let orchid = reg.get(&"orchid".into()).unwrap();
        assert_eq!(orchid.target_height(2.0), Some(0.7));
        // short cake: floor at the fraction itself
        assert_eq!(orchid.target_height(0.5), Some(0.35));
        assert_eq!(orchid.target_height(0.0), Some(0.35));
        assert_eq!(reg.get(&"candle".into()).unwrap().target_height(2.0), None);
    }
}
