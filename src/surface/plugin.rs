// src/surface/plugin.rs
//! Cake loading: spawn the model, wait for it, extract its triangles off the
//! main thread, normalize it and hand the placement state to the board.

use bevy::asset::LoadState;
use bevy::gltf::{Gltf, GltfAssetLabel};
use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use futures_lite::future;

use crate::decor::board::{DecorBoard, PlacementState};
use crate::decor::core::SurfaceMetrics;
use crate::decor::geometry::normalize_surface;
use crate::settings::{DecorSettings, SurfaceSource};

use super::hierarchy::{mark_scene_ready, mesh_nodes, SceneReady};
use super::mesh::{MeshSnapshot, TriangleSurface};

/// Marker on the cake root entity.
#[derive(Component)]
pub struct CakeRoot;

/// Fired once the cake is normalized and decorations can be placed.
#[derive(Event, Clone, Copy, Debug)]
pub struct SurfaceReady(pub SurfaceMetrics);

/// Where the cake load currently stands.
#[derive(Resource, Default)]
pub enum SurfaceLoad {
    #[default]
    Idle,
    /// Waiting for the model to exist. `gltf` is held to detect load failure.
    Spawning { root: Entity, gltf: Option<Handle<Gltf>> },
    /// Triangles captured; building the ray-cast surface.
    Building { root: Entity, task: Task<Option<BuiltSurface>> },
    Ready,
    Failed,
}

/// Result of the async surface build.
pub struct BuiltSurface {
    pub surface: TriangleSurface,
    /// Root transform that normalizes the model.
    pub normalize: Transform,
    pub metrics: SurfaceMetrics,
}

impl BuiltSurface {
    /// Normalize raw root-space triangles. `None` if there are none.
    pub fn from_snapshots(snapshots: &[MeshSnapshot]) -> Option<Self> {
        let raw = TriangleSurface::from_snapshots(snapshots);
        let raw_bounds = raw.bounds()?;
        let normalize = normalize_surface(&raw_bounds);
        let surface = raw.transformed(&normalize);
        let metrics = SurfaceMetrics::from_bounds(&surface.bounds()?);
        Some(Self { surface, normalize, metrics })
    }
}

pub struct SurfacePlugin;

impl Plugin for SurfacePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SurfaceLoad>()
            .add_event::<SurfaceReady>()
            .add_observer(mark_scene_ready)
            .add_systems(Startup, spawn_surface)
            .add_systems(Update, capture_surface_meshes)
            .add_systems(Update, receive_surface.after(capture_surface_meshes));
    }
}

/// Startup: spawn the cake hidden; it shows once normalized.
fn spawn_surface(
    mut commands: Commands,
    mut load: ResMut<SurfaceLoad>,
    settings: Res<DecorSettings>,
    assets: Res<AssetServer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    match &settings.surface {
        SurfaceSource::Scene { path } => {
            let scene = assets.load(GltfAssetLabel::Scene(0).from_asset(path.clone()));
            let gltf: Handle<Gltf> = assets.load(path.clone());
            let root = commands
                .spawn((SceneRoot(scene), Transform::default(), Visibility::Hidden, CakeRoot))
                .id();
            *load = SurfaceLoad::Spawning { root, gltf: Some(gltf) };
            info!("Surface: loading cake scene '{}'", path);
        }
        SurfaceSource::Cylinder { radius, height } => {
            let mesh = meshes.add(Cylinder::new(*radius, *height));
            let material = materials.add(StandardMaterial {
                base_color: Color::srgb_u8(0xf3, 0xe5, 0xd0),
                perceptual_roughness: 0.8,
                ..default()
            });
            let root = commands
                .spawn((
                    Mesh3d(mesh),
                    MeshMaterial3d(material),
                    Transform::default(),
                    Visibility::Hidden,
                    CakeRoot,
                    SceneReady,
                ))
                .id();
            *load = SurfaceLoad::Spawning { root, gltf: None };
            info!("Surface: procedural cake r={} h={}", radius, height);
        }
    }
}

/// Update: once the cake hierarchy exists, copy its triangles into an async
/// build task. Detects failed glTF loads.
fn capture_surface_meshes(
    mut load: ResMut<SurfaceLoad>,
    assets: Res<AssetServer>,
    meshes: Res<Assets<Mesh>>,
    ready_q: Query<(), With<SceneReady>>,
    children_q: Query<&Children>,
    nodes_q: Query<(&Transform, Option<&Mesh3d>)>,
) {
    let SurfaceLoad::Spawning { root, gltf } = &*load else { return };
    let root = *root;

    if let Some(gltf) = gltf {
        if let LoadState::Failed(err) = assets.load_state(gltf.id()) {
            error!("Surface: cake failed to load: {}", err);
            *load = SurfaceLoad::Failed;
            return;
        }
    }
    if ready_q.get(root).is_err() {
        return;
    }

    let snapshots: Vec<MeshSnapshot> = mesh_nodes(root, &children_q, &nodes_q)
        .into_iter()
        .filter_map(|node| MeshSnapshot::capture(meshes.get(&node.mesh)?, node.to_root))
        .collect();
    debug!("Surface: captured {} meshes", snapshots.len());

    let task = AsyncComputeTaskPool::get().spawn(async move { BuiltSurface::from_snapshots(&snapshots) });
    *load = SurfaceLoad::Building { root, task };
}

/// Update: collect the finished build, normalize the cake and attach the
/// placement state to the board.
fn receive_surface(
    mut load: ResMut<SurfaceLoad>,
    mut board: ResMut<DecorBoard>,
    settings: Res<DecorSettings>,
    mut roots: Query<(&mut Transform, &mut Visibility), With<CakeRoot>>,
    mut ready: EventWriter<SurfaceReady>,
) {
    let SurfaceLoad::Building { root, task } = &mut *load else { return };
    let root = *root;
    let Some(built) = future::block_on(future::poll_once(task)) else { return };

    let Some(built) = built else {
        error!("Surface: cake has no triangles; decorations cannot be placed");
        *load = SurfaceLoad::Failed;
        return;
    };

    if let Ok((mut tf, mut vis)) = roots.get_mut(root) {
        *tf = built.normalize;
        *vis = Visibility::Inherited;
    }

    let metrics = built.metrics;
    info!(
        "Surface: ready ({} triangles, top={:.3}, ring radius={:.3})",
        built.surface.len(),
        metrics.top_height,
        metrics.radius
    );
    board.attach_surface(PlacementState::new(
        metrics,
        Box::new(built.surface),
        settings.slot_count,
        PlacementState::rng_from_seed(settings.seed),
    ));
    ready.write(SurfaceReady(metrics));
    *load = SurfaceLoad::Ready;
}
