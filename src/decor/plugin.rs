// src/decor/plugin.rs
//! Decoration plugin wiring (glue).
//! - Registry asset/loader, board + settings
//! - `DecorCommand` handling (toggle / select / move / scale)
//! - Scene completion, transform sync, handle gizmos

use bevy::asset::LoadState;
use bevy::prelude::*;
use std::collections::HashMap;

use super::board::{
    AddOutcome, DecorBoard, DecorLoadError, LoadOutcome, PlacementError, RemoveOutcome, ToggleOutcome,
};
use super::builders::{initial_body, parts_body, retune_materials, spawn_parts, spawn_scene, DecorNode, PendingScene};
use super::core::{DecorBody, DecorKey};
use super::registry::{DecorRegistry, DecorRegistryAssetPlugin, DecorRender};
use crate::settings::DecorSettings;
use crate::surface::hierarchy::{measure_bounds, mesh_nodes, SceneReady};

/// Scale step for one "Scale +/-" press.
pub const SCALE_STEP: f32 = 1.05;
/// Arrow-key nudge distance.
pub const NUDGE_STEP: f32 = 0.02;

/// Handle to the loaded DecorRegistry asset.
#[derive(Resource, Default)]
pub struct DecorRegistryHandle(pub Handle<DecorRegistry>);

/// Scene entity for every decoration that is placed or loading.
#[derive(Resource, Default)]
pub struct DecorEntities(pub HashMap<DecorKey, Entity>);

/// Decoration the edit panel acts on.
#[derive(Resource, Default)]
pub struct DecorSelection(pub Option<DecorKey>);

/// Everything the UI and input can ask of the board.
#[derive(Event, Clone, Debug, PartialEq)]
pub enum DecorCommand {
    Toggle(DecorKey),
    /// Select the next placed decoration.
    CycleSelection,
    /// Attach the move handle to the selection, or detach it.
    ToggleMove,
    /// Multiply the selection's scale.
    Rescale(f32),
    /// Move the handle-bound decoration by (dx, dz).
    Nudge(Vec2),
    /// Move the handle-bound decoration to (x, z).
    MoveTo(Vec2),
}

/// One line for the toast.
#[derive(Event, Clone, Debug)]
pub struct DecorNotice(pub String);

pub struct DecorPlugin;

impl Plugin for DecorPlugin {
    fn build(&self, app: &mut App) {
        let max_items = app
            .world()
            .get_resource::<DecorSettings>()
            .map_or_else(|| DecorSettings::default().max_items, |s| s.max_items);

        app.add_plugins(DecorRegistryAssetPlugin)
            .init_resource::<DecorSettings>()
            .insert_resource(DecorBoard::new(max_items))
            .init_resource::<DecorRegistryHandle>()
            .init_resource::<DecorEntities>()
            .init_resource::<DecorSelection>()
            .add_event::<DecorCommand>()
            .add_event::<DecorNotice>()
            .add_systems(Startup, load_registry)
            .add_systems(Update, register_decorations)
            .add_systems(Update, handle_decor_commands.after(register_decorations))
            .add_systems(Update, finish_pending_scenes.after(handle_decor_commands))
            .add_systems(Update, sync_decor_transforms.after(finish_pending_scenes))
            .add_systems(Update, draw_decor_gizmos.after(sync_decor_transforms));
    }
}

/// Startup: request loading the registry manifest, store handle.
fn load_registry(
    mut handle_res: ResMut<DecorRegistryHandle>,
    settings: Res<DecorSettings>,
    assets: Res<AssetServer>,
) {
    if handle_res.0.is_strong() {
        return;
    }
    handle_res.0 = assets.load(settings.registry_path.as_str());
    info!(
        "Decor: loading registry from '{}' (max_items={}, slots={})",
        settings.registry_path, settings.max_items, settings.slot_count
    );
}

/// Update: once the registry is available, register its keys with the board.
fn register_decorations(
    handle_res: Res<DecorRegistryHandle>,
    registries: Res<Assets<DecorRegistry>>,
    assets: Res<AssetServer>,
    mut board: ResMut<DecorBoard>,
    mut done: Local<bool>,
) {
    if *done {
        return;
    }
    if let Some(registry) = registries.get(&handle_res.0) {
        for def in &registry.decorations {
            board.register(def.key());
        }
        *done = true;
        info!(
            "Decor: registry ready ({} decorations, at most {} on the cake)",
            registry.decorations.len(),
            board.max_items()
        );
    } else if let LoadState::Failed(err) = assets.load_state(handle_res.0.id()) {
        *done = true;
        error!("Decor: registry failed to load: {}", err);
    }
}

/// Next placed key after `current`, wrapping; the first one if `current`
/// isn't placed.
pub fn next_selection<'a>(
    placed: impl IntoIterator<Item = &'a DecorKey>,
    current: Option<&DecorKey>,
) -> Option<DecorKey> {
    let placed: Vec<&DecorKey> = placed.into_iter().collect();
    let next = match current.and_then(|c| placed.iter().position(|k| *k == c)) {
        Some(i) => placed.get((i + 1) % placed.len()),
        None => placed.first(),
    };
    next.map(|k| (*k).clone())
}

/// Bookkeeping shared by the command handler and scene completion.
struct Settle<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    board: &'a mut DecorBoard,
    entities: &'a mut DecorEntities,
    selection: &'a mut DecorSelection,
    /// Flushed to `DecorNotice` events by the caller.
    notices: Vec<DecorNotice>,
}

impl Settle<'_, '_, '_> {
    fn despawn(&mut self, key: &DecorKey) {
        if let Some(entity) = self.entities.0.remove(key) {
            self.commands.entity(entity).despawn();
        }
    }

    fn notify(&mut self, msg: String) {
        self.notices.push(DecorNotice(msg));
    }

    /// Feed a finished build to the board and act on the outcome.
    fn complete(&mut self, key: &DecorKey, loaded: Result<DecorBody, DecorLoadError>) {
        match self.board.complete_add(key, loaded) {
            Ok(LoadOutcome::Placed { slot }) => {
                info!("Decor: '{}' placed in slot {}", key, slot);
                if self.selection.0.is_none() {
                    self.selection.0 = Some(key.clone());
                }
                self.notify(format!("{} added", key.label()));
            }
            Ok(LoadOutcome::Cancelled) => {
                debug!("Decor: '{}' load discarded", key);
                self.despawn(key);
            }
            Err(e) => {
                warn!("Decor: '{}' not placed: {}", key, e);
                self.despawn(key);
                self.notify(e.to_string());
            }
        }
    }

    fn removed(&mut self, key: &DecorKey, outcome: RemoveOutcome) {
        match outcome {
            RemoveOutcome::Removed { slot } => {
                info!("Decor: '{}' removed (slot {:?})", key, slot);
                self.despawn(key);
            }
            // Visual is discarded when its load completes.
            RemoveOutcome::CancelledLoad => debug!("Decor: '{}' load cancelled", key),
            RemoveOutcome::NotPlaced => return,
        }
        if self.selection.0.as_ref() == Some(key) {
            self.selection.0 = next_selection(self.board.placed().map(|(k, _)| k), None);
        }
        self.notify(format!("{} removed", key.label()));
    }

    fn fail(&mut self, e: PlacementError) {
        debug!("Decor: {}", e);
        self.notify(e.to_string());
    }
}

/// Update: apply UI/input commands to the board and start builds.
#[allow(clippy::too_many_arguments)]
fn handle_decor_commands(
    mut commands: Commands,
    mut evr: EventReader<DecorCommand>,
    mut board: ResMut<DecorBoard>,
    mut entities: ResMut<DecorEntities>,
    mut selection: ResMut<DecorSelection>,
    mut notices: EventWriter<DecorNotice>,
    handle_res: Res<DecorRegistryHandle>,
    registries: Res<Assets<DecorRegistry>>,
    assets: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Idle frames must not mark the board changed.
    if evr.is_empty() {
        return;
    }
    let mut settle = Settle {
        commands: &mut commands,
        board: &mut *board,
        entities: &mut *entities,
        selection: &mut *selection,
        notices: Vec::new(),
    };

    for cmd in evr.read() {
        match cmd {
            DecorCommand::Toggle(key) => match settle.board.toggle(key) {
                Ok(ToggleOutcome::Add(AddOutcome::Requested)) => {
                    // A cancelled load that is still running gets reused.
                    if settle.entities.0.contains_key(key) {
                        debug!("Decor: '{}' resumes its pending load", key);
                        continue;
                    }
                    let Some(def) = registries.get(&handle_res.0).and_then(|r| r.get(key)) else {
                        settle.complete(key, Err(DecorLoadError::Asset {
                            path: key.to_string(),
                            reason: "not in registry".into(),
                        }));
                        continue;
                    };
                    let top = settle.board.placement().map_or(1.0, |p| p.metrics.top_height);
                    match &def.render {
                        DecorRender::Parts { parts } => {
                            let entity = spawn_parts(settle.commands, &mut meshes, &mut materials, def, parts);
                            settle.entities.0.insert(key.clone(), entity);
                            settle.complete(key, parts_body(def, top));
                        }
                        DecorRender::Scene { path } => {
                            let entity = spawn_scene(settle.commands, &assets, def, path);
                            settle.entities.0.insert(key.clone(), entity);
                            debug!("Decor: '{}' loading '{}'", key, path);
                        }
                    }
                }
                Ok(ToggleOutcome::Add(AddOutcome::AlreadyPlaced)) => {}
                Ok(ToggleOutcome::Remove(outcome)) => settle.removed(key, outcome),
                Err(e) => settle.fail(e),
            },
            DecorCommand::CycleSelection => {
                let next = next_selection(settle.board.placed().map(|(k, _)| k), settle.selection.0.as_ref());
                if next.is_none() {
                    settle.notify("Nothing to select".into());
                }
                if let Some(key) = &next {
                    if settle.board.handle().is_some() {
                        // The handle follows the selection.
                        if let Err(e) = settle.board.attach_handle(key) {
                            settle.fail(e);
                        }
                    }
                    debug!("Decor: selected '{}'", key);
                }
                settle.selection.0 = next;
            }
            DecorCommand::ToggleMove => {
                if let Some(key) = settle.board.detach_handle() {
                    debug!("Decor: move off for '{}'", key);
                    continue;
                }
                if !settle.selection.0.as_ref().is_some_and(|k| settle.board.is_placed(k)) {
                    settle.selection.0 = next_selection(settle.board.placed().map(|(k, _)| k), None);
                }
                match settle.selection.0.clone() {
                    Some(key) => match settle.board.attach_handle(&key) {
                        Ok(()) => debug!("Decor: move on for '{}'", key),
                        Err(e) => settle.fail(e),
                    },
                    None => settle.notify("Nothing to move".into()),
                }
            }
            DecorCommand::Rescale(factor) => {
                let Some(key) = settle.selection.0.clone() else { continue };
                if let Err(e) = settle.board.rescale(&key, *factor) {
                    settle.fail(e);
                }
            }
            DecorCommand::Nudge(delta) => {
                let Some(key) = settle.board.handle().cloned() else { continue };
                if let Err(e) = settle.board.nudge(&key, delta.x, delta.y) {
                    settle.fail(e);
                }
            }
            DecorCommand::MoveTo(p) => {
                let Some(key) = settle.board.handle().cloned() else { continue };
                if let Err(e) = settle.board.move_to(&key, p.x, p.y) {
                    settle.fail(e);
                }
            }
        }
    }
    notices.write_batch(settle.notices);
}

/// Update: complete glTF decorations whose scene is ready or whose load failed.
#[allow(clippy::too_many_arguments)]
fn finish_pending_scenes(
    mut commands: Commands,
    pending: Query<(Entity, &DecorNode, &PendingScene, Has<SceneReady>)>,
    children_q: Query<&Children>,
    nodes_q: Query<(&Transform, Option<&Mesh3d>)>,
    mut material_q: Query<&mut MeshMaterial3d<StandardMaterial>>,
    meshes: Res<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    assets: Res<AssetServer>,
    handle_res: Res<DecorRegistryHandle>,
    registries: Res<Assets<DecorRegistry>>,
    mut board: ResMut<DecorBoard>,
    mut entities: ResMut<DecorEntities>,
    mut selection: ResMut<DecorSelection>,
    mut notices: EventWriter<DecorNotice>,
) {
    let top = board.placement().map_or(1.0, |p| p.metrics.top_height);
    let mut finished = Vec::new();
    for (entity, DecorNode(key), scene, ready) in &pending {
        let loaded = if let LoadState::Failed(err) = assets.load_state(scene.gltf.id()) {
            Err(DecorLoadError::Asset { path: scene.path.clone(), reason: err.to_string() })
        } else if ready {
            let Some(def) = registries.get(&handle_res.0).and_then(|r| r.get(key)) else { continue };
            let nodes = mesh_nodes(entity, &children_q, &nodes_q);
            let tuned = retune_materials(&nodes, &mut material_q, &mut materials, def.tuning);
            debug!("Decor: '{}' has {} meshes, {} tuned", key, nodes.len(), tuned);
            measure_bounds(&nodes, &meshes)
                .map(|bounds| initial_body(def, bounds, top))
                .ok_or_else(|| DecorLoadError::EmptyGeometry { path: scene.path.clone() })
        } else {
            continue;
        };
        finished.push((entity, key.clone(), loaded));
    }
    // Scenes still loading leave the board untouched.
    if finished.is_empty() {
        return;
    }

    let mut settle = Settle {
        commands: &mut commands,
        board: &mut *board,
        entities: &mut *entities,
        selection: &mut *selection,
        notices: Vec::new(),
    };
    for (entity, key, loaded) in finished {
        settle.commands.entity(entity).remove::<PendingScene>();
        settle.complete(&key, loaded);
    }
    notices.write_batch(settle.notices);
}

/// Update: the board's bodies drive the decoration transforms.
fn sync_decor_transforms(
    board: Res<DecorBoard>,
    mut nodes: Query<(&DecorNode, &mut Transform, &mut Visibility), Without<PendingScene>>,
) {
    for (DecorNode(key), mut tf, mut vis) in &mut nodes {
        let Some(body) = board.body(key) else { continue };
        if *tf != body.transform {
            *tf = body.transform;
        }
        if *vis == Visibility::Hidden {
            *vis = Visibility::Inherited;
        }
    }
}

/// Update: ring around the handle-bound decoration, markers on the slots.
fn draw_decor_gizmos(board: Res<DecorBoard>, selection: Res<DecorSelection>, mut gizmos: Gizmos) {
    let Some(placement) = board.placement() else { return };
    let flat = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);

    for slot in placement.slots().slots() {
        let color = if slot.is_free() {
            Color::srgba(0.6, 0.8, 1.0, 0.5)
        } else {
            Color::srgba(1.0, 0.6, 0.3, 0.8)
        };
        gizmos.sphere(Isometry3d::from_translation(slot.position()), 0.015, color);
    }

    let ring = |key: &DecorKey| {
        let body = board.body(key)?;
        let b = body.world_bounds();
        let r = b.size().x.max(b.size().z) * 0.5 + 0.04;
        Some((Vec3::new(b.center().x, b.min.y + 0.005, b.center().z), r))
    };
    if let Some((pos, r)) = board.handle().and_then(ring) {
        gizmos.circle(Isometry3d::new(pos, flat), r, Color::srgb(1.0, 0.85, 0.2));
    } else if let Some((pos, r)) = selection.0.as_ref().and_then(ring) {
        gizmos.circle(Isometry3d::new(pos, flat), r, Color::srgba(1.0, 1.0, 1.0, 0.4));
    }
}
