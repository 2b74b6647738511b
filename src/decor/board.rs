// src/decor/board.rs
//! Placement orchestration: add/remove/move/rescale decorations against the
//! slot ring and the surface drop, under a max-item policy.
//!
//! Adding is split at the load boundary: `request_add` validates and marks the
//! key as loading, `complete_add` runs once the visual exists and only then
//! claims a slot. Nothing is reserved while a load is in flight.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::core::{DecorBody, DecorKey, SurfaceCaster, SurfaceMetrics};
use super::drop::drop_onto_surface;
use super::slots::SlotRing;

// ---------- Per-surface state ----------

/// Everything that only exists once the surface has loaded.
pub struct PlacementState {
    pub metrics: SurfaceMetrics,
    surface: Box<dyn SurfaceCaster>,
    slots: SlotRing,
    rng: ChaCha8Rng,
}

impl PlacementState {
    pub fn new(
        metrics: SurfaceMetrics,
        surface: Box<dyn SurfaceCaster>,
        slot_count: usize,
        rng: ChaCha8Rng,
    ) -> Self {
        Self {
            metrics,
            surface,
            slots: SlotRing::with_slots(slot_count, &metrics),
            rng,
        }
    }

    /// Jitter source: fixed seed for reproducible layouts, else fresh entropy.
    pub fn rng_from_seed(seed: Option<u64>) -> ChaCha8Rng {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        ChaCha8Rng::seed_from_u64(seed)
    }

    pub fn slots(&self) -> &SlotRing {
        &self.slots
    }

    /// Snap `body` onto the surface below its current X/Z.
    pub fn drop_body(&self, body: &mut DecorBody) {
        drop_onto_surface(body, Some(&*self.surface), self.metrics.top_height);
    }
}

// ---------- Entries ----------

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Phase {
    #[default]
    Absent,
    /// Load in flight. `cancelled` is set by a remove issued meanwhile.
    Loading { cancelled: bool },
    Placed,
}

#[derive(Clone, Debug)]
struct DecorEntry {
    key: DecorKey,
    phase: Phase,
    body: Option<DecorBody>,
}

// ---------- Outcomes ----------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Already on the surface; nothing to do.
    AlreadyPlaced,
    /// Marked as loading; start building the visual.
    Requested,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Placed { slot: usize },
    /// Removed while loading; discard the visual.
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed { slot: Option<usize> },
    /// Was loading; the load result will be discarded.
    CancelledLoad,
    NotPlaced,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    Add(AddOutcome),
    Remove(RemoveOutcome),
}

// ---------- Board ----------

/// Owns per-key decoration state and, once loaded, the placement state.
#[derive(Resource)]
pub struct DecorBoard {
    entries: Vec<DecorEntry>,
    max_items: usize,
    placement: Option<PlacementState>,
    /// Key the manipulation handle is bound to.
    handle: Option<DecorKey>,
}

impl DecorBoard {
    pub fn new(max_items: usize) -> Self {
        Self { entries: Vec::new(), max_items, placement: None, handle: None }
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Register a decoration type. Re-registering a known key is a no-op.
    pub fn register(&mut self, key: DecorKey) {
        if self.entry(&key).is_none() {
            self.entries.push(DecorEntry { key, phase: Phase::Absent, body: None });
        }
    }

    /// Install the surface. Replaces any previous placement state; bodies
    /// placed against the old surface are cleared.
    pub fn attach_surface(&mut self, state: PlacementState) {
        for e in &mut self.entries {
            if e.phase == Phase::Placed {
                e.phase = Phase::Absent;
                e.body = None;
            }
        }
        self.handle = None;
        self.placement = Some(state);
    }

    pub fn placement(&self) -> Option<&PlacementState> {
        self.placement.as_ref()
    }

    pub fn occupied_count(&self) -> usize {
        self.placement.as_ref().map_or(0, |p| p.slots.occupied_count())
    }

    pub fn keys(&self) -> impl Iterator<Item = &DecorKey> {
        self.entries.iter().map(|e| &e.key)
    }

    pub fn is_placed(&self, key: &DecorKey) -> bool {
        self.entry(key).is_some_and(|e| e.phase == Phase::Placed)
    }

    pub fn is_loading(&self, key: &DecorKey) -> bool {
        self.entry(key).is_some_and(|e| matches!(e.phase, Phase::Loading { .. }))
    }

    pub fn body(&self, key: &DecorKey) -> Option<&DecorBody> {
        self.entry(key)?.body.as_ref()
    }

    /// Placed decorations in registration order.
    pub fn placed(&self) -> impl Iterator<Item = (&DecorKey, &DecorBody)> {
        self.entries.iter().filter_map(|e| e.body.as_ref().map(|b| (&e.key, b)))
    }

    /// Toggle-button text for `key`.
    pub fn button_label(&self, key: &DecorKey) -> String {
        let name = key.label();
        match self.entry(key).map(|e| &e.phase) {
            Some(Phase::Placed) => format!("Remove {name}"),
            Some(Phase::Loading { cancelled: false }) => format!("Loading {name}…"),
            _ => format!("Add {name}"),
        }
    }

    // ---- add ----

    /// First half of Add: validate and mark `key` as loading.
    pub fn request_add(&mut self, key: &DecorKey) -> Result<AddOutcome, PlacementError> {
        let max = self.max_items;
        let occupied = self.occupied_count();
        let free = self.placement.as_ref().and_then(|p| p.slots.find_free_slot());

        let entry = self
            .entry_mut(key)
            .ok_or_else(|| PlacementError::UnknownDecoration(key.clone()))?;
        match entry.phase {
            Phase::Placed => return Ok(AddOutcome::AlreadyPlaced),
            Phase::Loading { cancelled: false } => return Err(PlacementError::LoadInFlight(key.clone())),
            Phase::Loading { cancelled: true } | Phase::Absent => {}
        }
        if occupied >= max {
            return Err(PlacementError::CapacityExceeded { max });
        }
        if free.is_none() {
            return Err(PlacementError::NoFreeSlot);
        }

        entry.phase = Phase::Loading { cancelled: false };
        debug!("Decor: '{}' requested ({} of {} placed)", key, occupied, max);
        Ok(AddOutcome::Requested)
    }

    /// Second half of Add: the visual for `key` is ready (or failed). Claims
    /// a slot, drops the body onto the surface and records it.
    pub fn complete_add(
        &mut self,
        key: &DecorKey,
        loaded: Result<DecorBody, DecorLoadError>,
    ) -> Result<LoadOutcome, PlacementError> {
        let max = self.max_items;
        let occupied = self.occupied_count();
        let Some(idx) = self.entries.iter().position(|e| &e.key == key) else {
            return Err(PlacementError::UnknownDecoration(key.clone()));
        };

        match self.entries[idx].phase {
            Phase::Loading { cancelled: true } => {
                self.entries[idx].phase = Phase::Absent;
                return Ok(LoadOutcome::Cancelled);
            }
            Phase::Loading { cancelled: false } => {}
            // Not expecting a load for this key: treat the result as stale.
            Phase::Absent | Phase::Placed => return Ok(LoadOutcome::Cancelled),
        }
        // Whatever happens next, the load is over.
        self.entries[idx].phase = Phase::Absent;

        let mut body = loaded.map_err(|source| PlacementError::AssetLoadFailure {
            key: key.clone(),
            source,
        })?;
        if occupied >= max {
            return Err(PlacementError::CapacityExceeded { max });
        }
        let placement = self.placement.as_mut().ok_or(PlacementError::NoFreeSlot)?;
        let slot = placement.slots.find_free_slot().ok_or(PlacementError::NoFreeSlot)?;

        let PlacementState { slots, rng, surface, metrics } = placement;
        let apex = metrics.top_height;
        let claimed = slots.occupy_slot(slot, key, &mut body, rng, |b| {
            drop_onto_surface(b, Some(&**surface), apex)
        });
        if !claimed {
            return Err(PlacementError::NoFreeSlot);
        }

        let entry = &mut self.entries[idx];
        entry.phase = Phase::Placed;
        entry.body = Some(body);
        Ok(LoadOutcome::Placed { slot })
    }

    // ---- remove ----

    /// Take `key` off the surface. Removing an absent key is a no-op; removing
    /// a loading key cancels the pending add.
    pub fn remove(&mut self, key: &DecorKey) -> RemoveOutcome {
        let Some(entry) = self.entries.iter_mut().find(|e| &e.key == key) else {
            return RemoveOutcome::NotPlaced;
        };
        match entry.phase {
            Phase::Absent | Phase::Loading { cancelled: true } => RemoveOutcome::NotPlaced,
            Phase::Loading { cancelled: false } => {
                entry.phase = Phase::Loading { cancelled: true };
                RemoveOutcome::CancelledLoad
            }
            Phase::Placed => {
                entry.phase = Phase::Absent;
                entry.body = None;
                if self.handle.as_ref() == Some(key) {
                    self.handle = None;
                }
                let slot = self.placement.as_mut().and_then(|p| p.slots.free_slot_by_key(key));
                RemoveOutcome::Removed { slot }
            }
        }
    }

    /// Remove if placed or loading, otherwise request an add.
    pub fn toggle(&mut self, key: &DecorKey) -> Result<ToggleOutcome, PlacementError> {
        let active = self
            .entry(key)
            .is_some_and(|e| matches!(e.phase, Phase::Placed | Phase::Loading { cancelled: false }));
        if active {
            Ok(ToggleOutcome::Remove(self.remove(key)))
        } else {
            self.request_add(key).map(ToggleOutcome::Add)
        }
    }

    // ---- edit ----

    /// Reposition horizontally, then re-drop onto the surface.
    pub fn move_to(&mut self, key: &DecorKey, x: f32, z: f32) -> Result<(), PlacementError> {
        self.edit(key, |body| {
            body.transform.translation.x = x;
            body.transform.translation.z = z;
        })
    }

    /// Move relative to the current position.
    pub fn nudge(&mut self, key: &DecorKey, dx: f32, dz: f32) -> Result<(), PlacementError> {
        self.edit(key, |body| {
            body.transform.translation.x += dx;
            body.transform.translation.z += dz;
        })
    }

    /// Multiply the current scale by `factor`, then re-drop.
    pub fn rescale(&mut self, key: &DecorKey, factor: f32) -> Result<(), PlacementError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(PlacementError::InvalidScale(factor));
        }
        self.edit(key, |body| body.transform.scale *= factor)
    }

    // ---- manipulation handle ----

    pub fn handle(&self) -> Option<&DecorKey> {
        self.handle.as_ref()
    }

    pub fn attach_handle(&mut self, key: &DecorKey) -> Result<(), PlacementError> {
        if !self.is_placed(key) {
            return Err(PlacementError::NotPlaced(key.clone()));
        }
        self.handle = Some(key.clone());
        Ok(())
    }

    pub fn detach_handle(&mut self) -> Option<DecorKey> {
        self.handle.take()
    }

    // ---- internals ----

    fn entry(&self, key: &DecorKey) -> Option<&DecorEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }

    fn entry_mut(&mut self, key: &DecorKey) -> Option<&mut DecorEntry> {
        self.entries.iter_mut().find(|e| &e.key == key)
    }

    fn edit(&mut self, key: &DecorKey, f: impl FnOnce(&mut DecorBody)) -> Result<(), PlacementError> {
        let not_placed = || PlacementError::NotPlaced(key.clone());
        let placement = self.placement.as_ref().ok_or_else(not_placed)?;
        let body = self
            .entries
            .iter_mut()
            .find(|e| &e.key == key)
            .and_then(|e| e.body.as_mut())
            .ok_or_else(not_placed)?;
        f(body);
        placement.drop_body(body);
        Ok(())
    }
}

// ---------- Errors ----------

/// Why a decoration visual could not be produced.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DecorLoadError {
    #[error("asset '{path}' failed to load: {reason}")]
    Asset { path: String, reason: String },
    #[error("asset '{path}' has no measurable geometry")]
    EmptyGeometry { path: String },
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PlacementError {
    #[error("All slots are occupied (max {max} items). Remove one first.")]
    CapacityExceeded { max: usize },
    #[error("No free slot on the cake")]
    NoFreeSlot,
    #[error("Could not load {key}: {source}")]
    AssetLoadFailure {
        key: DecorKey,
        #[source]
        source: DecorLoadError,
    },
    #[error("Unknown decoration '{0}'")]
    UnknownDecoration(DecorKey),
    #[error("{0} is still loading")]
    LoadInFlight(DecorKey),
    #[error("{0} is not on the cake")]
    NotPlaced(DecorKey),
    #[error("Scale factor {0} must be finite and positive")]
    InvalidScale(f32),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decor::core::Bounds;
    use crate::decor::geometry::base_offset;
    use crate::surface::mesh::TriangleSurface;

    const KEYS: [&str; 7] = ["strawberry", "candle", "chocolate", "orchid", "cherry", "macaron", "sparkler"];

    /// Flat 2x2 cake top at y=1 (apex 1.0).
    fn flat_state(slots: usize) -> PlacementState {
        let surface = TriangleSurface::from_triangles(TriangleSurface::quad_triangles(
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ));
        PlacementState::new(
            SurfaceMetrics { top_height: 1.0, radius: 0.8 },
            Box::new(surface),
            slots,
            PlacementState::rng_from_seed(Some(11)),
        )
    }

    fn board(max_items: usize, slots: usize) -> DecorBoard {
        let mut b = DecorBoard::new(max_items);
        for k in KEYS {
            b.register(k.into());
        }
        b.attach_surface(flat_state(slots));
        b
    }

    fn loaded_body() -> Result<DecorBody, DecorLoadError> {
        Ok(DecorBody::new(
            Transform::IDENTITY,
            Bounds::new(Vec3::new(-0.05, 0.0, -0.05), Vec3::new(0.05, 0.15, 0.05)),
        ))
    }

    fn add(b: &mut DecorBoard, key: &str) -> Result<LoadOutcome, PlacementError> {
        let key = DecorKey::from(key);
        b.request_add(&key)?;
        b.complete_add(&key, loaded_body())
    }

    #[test]
    fn test_capacity_scenario() {
        let mut b = board(6, 6);
        assert_eq!(b.occupied_count(), 0);

        add(&mut b, "strawberry").unwrap();
        assert_eq!(b.occupied_count(), 1);
        let slots = b.placement().unwrap().slots();
        let holders: Vec<_> = slots.slots().iter().filter_map(|s| s.occupied_by()).collect();
        assert_eq!(holders, vec![&DecorKey::from("strawberry")]);

        for k in &KEYS[1..6] {
            add(&mut b, k).unwrap();
        }
        assert_eq!(b.occupied_count(), 6);

        let err = add(&mut b, "sparkler").unwrap_err();
        assert_eq!(err, PlacementError::CapacityExceeded { max: 6 });
        assert_eq!(b.occupied_count(), 6);
        assert!(!b.is_loading(&"sparkler".into()));
    }

    #[test]
    fn test_placed_body_rests_on_surface() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        let body = b.body(&"candle".into()).unwrap();
        let expected = 1.0 + base_offset(body);
        assert!((body.position().y - expected).abs() < 1e-5);
        assert!((body.world_bounds().min.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_add_when_placed_is_noop() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        assert_eq!(b.request_add(&"candle".into()), Ok(AddOutcome::AlreadyPlaced));
        assert_eq!(b.occupied_count(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        assert_eq!(b.remove(&"orchid".into()), RemoveOutcome::NotPlaced);
        assert_eq!(b.remove(&"nope".into()), RemoveOutcome::NotPlaced);
        assert_eq!(b.occupied_count(), 1);
        assert!(b.is_placed(&"candle".into()));
    }

    #[test]
    fn test_remove_frees_slot_and_handle() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        let key = DecorKey::from("candle");
        b.attach_handle(&key).unwrap();

        assert_eq!(b.remove(&key), RemoveOutcome::Removed { slot: Some(0) });
        assert_eq!(b.occupied_count(), 0);
        assert!(b.body(&key).is_none());
        assert!(b.handle().is_none());
    }

    #[test]
    fn test_load_failure_leaves_no_occupancy() {
        let mut b = board(3, 6);
        let key = DecorKey::from("orchid");
        b.request_add(&key).unwrap();
        let err = b
            .complete_add(&key, Err(DecorLoadError::Asset { path: "models/orchid.glb".into(), reason: "404".into() }))
            .unwrap_err();
        assert!(matches!(err, PlacementError::AssetLoadFailure { .. }));
        assert_eq!(b.occupied_count(), 0);
        assert!(!b.is_loading(&key));
        // can retry
        assert_eq!(b.request_add(&key), Ok(AddOutcome::Requested));
    }

    #[test]
    fn test_duplicate_request_while_loading() {
        let mut b = board(3, 6);
        let key = DecorKey::from("chocolate");
        b.request_add(&key).unwrap();
        assert_eq!(b.request_add(&key), Err(PlacementError::LoadInFlight(key.clone())));
        assert_eq!(b.button_label(&key), "Loading Chocolate…");
    }

    #[test]
    fn test_remove_while_loading_cancels() {
        let mut b = board(3, 6);
        let key = DecorKey::from("chocolate");
        b.request_add(&key).unwrap();
        assert_eq!(b.remove(&key), RemoveOutcome::CancelledLoad);
        assert_eq!(b.complete_add(&key, loaded_body()), Ok(LoadOutcome::Cancelled));
        assert!(!b.is_placed(&key));
        assert_eq!(b.occupied_count(), 0);
    }

    #[test]
    fn test_capacity_rechecked_after_load() {
        let mut b = board(1, 6);
        let a = DecorKey::from("candle");
        let c = DecorKey::from("cherry");
        b.request_add(&a).unwrap();
        b.request_add(&c).unwrap();
        assert!(b.complete_add(&a, loaded_body()).is_ok());
        assert_eq!(
            b.complete_add(&c, loaded_body()),
            Err(PlacementError::CapacityExceeded { max: 1 })
        );
        assert_eq!(b.occupied_count(), 1);
    }

    #[test]
    fn test_no_free_slot_when_max_exceeds_slots() {
        let mut b = board(5, 2);
        add(&mut b, "candle").unwrap();
        add(&mut b, "cherry").unwrap();
        assert_eq!(add(&mut b, "orchid"), Err(PlacementError::NoFreeSlot));
    }

    #[test]
    fn test_add_before_surface() {
        let mut b = DecorBoard::new(3);
        b.register("candle".into());
        assert_eq!(b.request_add(&"candle".into()), Err(PlacementError::NoFreeSlot));
        assert_eq!(
            b.request_add(&"ghost".into()),
            Err(PlacementError::UnknownDecoration("ghost".into()))
        );
    }

    #[test]
    fn test_move_redrops() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        let key = DecorKey::from("candle");

        b.move_to(&key, 0.3, -0.2).unwrap();
        let p = b.body(&key).unwrap().position();
        assert_eq!((p.x, p.z), (0.3, -0.2));
        assert!((b.body(&key).unwrap().world_bounds().min.y - 1.0).abs() < 1e-5);

        // off the footprint: rests at apex height
        b.nudge(&key, 5.0, 0.0).unwrap();
        assert!((b.body(&key).unwrap().world_bounds().min.y - 1.0).abs() < 1e-5);

        assert_eq!(
            b.move_to(&"orchid".into(), 0.0, 0.0),
            Err(PlacementError::NotPlaced("orchid".into()))
        );
    }

    #[test]
    fn test_rescale_redrops() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        let key = DecorKey::from("candle");
        let h0 = b.body(&key).unwrap().world_bounds().height();

        b.rescale(&key, 2.0).unwrap();
        let body = b.body(&key).unwrap();
        assert!((body.world_bounds().height() - 2.0 * h0).abs() < 1e-5);
        assert!((body.world_bounds().min.y - 1.0).abs() < 1e-5);

        assert_eq!(b.rescale(&key, 0.0), Err(PlacementError::InvalidScale(0.0)));
    }

    #[test]
    fn test_toggle_round_trip() {
        let mut b = board(3, 6);
        let key = DecorKey::from("strawberry");
        assert_eq!(b.button_label(&key), "Add Strawberry");
        assert_eq!(b.toggle(&key), Ok(ToggleOutcome::Add(AddOutcome::Requested)));
        b.complete_add(&key, loaded_body()).unwrap();
        assert_eq!(b.button_label(&key), "Remove Strawberry");
        assert_eq!(
            b.toggle(&key),
            Ok(ToggleOutcome::Remove(RemoveOutcome::Removed { slot: Some(0) }))
        );
        assert_eq!(b.button_label(&key), "Add Strawberry");
    }

    #[test]
    fn test_handle_requires_placed() {
        let mut b = board(3, 6);
        assert!(b.attach_handle(&"candle".into()).is_err());
        add(&mut b, "candle").unwrap();
        b.attach_handle(&"candle".into()).unwrap();
        assert_eq!(b.detach_handle(), Some("candle".into()));
        assert!(b.handle().is_none());
    }

    #[test]
    fn test_reattach_surface_clears_bodies() {
        let mut b = board(3, 6);
        add(&mut b, "candle").unwrap();
        b.attach_surface(flat_state(4));
        assert_eq!(b.occupied_count(), 0);
        assert!(!b.is_placed(&"candle".into()));
        assert_eq!(b.placement().unwrap().slots().slots().len(), 4);
    }

    #[test]
    fn test_relayout_keeps_capacity_honest() {
        let mut b = board(2, 6);
        assert_eq!(b.max_items(), 2);
        add(&mut b, "candle").unwrap();
        add(&mut b, "orchid").unwrap();
        b.attach_handle(&"orchid".into()).unwrap();

        // A new ring drops every placement along with its slot.
        b.attach_surface(flat_state(3));
        assert_eq!(b.placed().count(), 0);
        assert_eq!(b.occupied_count(), 0);
        assert!(b.handle().is_none());

        add(&mut b, "candle").unwrap();
        add(&mut b, "cherry").unwrap();
        assert_eq!(b.placed().count(), b.occupied_count());
        assert_eq!(add(&mut b, "orchid").unwrap_err(), PlacementError::CapacityExceeded { max: 2 });
    }
}
