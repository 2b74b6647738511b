// src/decor/slots.rs
//! Fixed ring of attachment points around the surface top.

use bevy::prelude::*;
use rand::Rng;

use super::core::{DecorBody, DecorKey, SurfaceMetrics};

/// Slots float this far above the apex to avoid z-fighting.
pub const SLOT_LIFT: f32 = 0.01;
/// Bodies start this far above their slot before being dropped.
pub const PROVISIONAL_LIFT: f32 = 0.2;
/// Full width of the horizontal jitter window (±half on each axis).
pub const JITTER_SPAN: f32 = 0.02;

/// One attachment point. Its position never changes after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    position: Vec3,
    occupied_by: Option<DecorKey>,
}

impl Slot {
    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn occupied_by(&self) -> Option<&DecorKey> {
        self.occupied_by.as_ref()
    }

    pub fn is_free(&self) -> bool {
        self.occupied_by.is_none()
    }
}

/// Ordered ring of slots. Order is creation order and never changes.
#[derive(Clone, Debug, Default)]
pub struct SlotRing {
    slots: Vec<Slot>,
}

impl SlotRing {
    /// Ring of `n` unoccupied slots around `metrics`.
    pub fn with_slots(n: usize, metrics: &SurfaceMetrics) -> Self {
        let mut ring = Self::default();
        ring.create_slots(n, metrics);
        ring
    }

    /// Replace every slot (and all occupancy) with `n` fresh ones at equal
    /// angular steps around the ring.
    pub fn create_slots(&mut self, n: usize, metrics: &SurfaceMetrics) {
        self.slots = (0..n)
            .map(|i| {
                let angle = (i as f32 / n as f32) * std::f32::consts::TAU;
                Slot {
                    position: Vec3::new(
                        angle.cos() * metrics.radius,
                        metrics.top_height + SLOT_LIFT,
                        angle.sin() * metrics.radius,
                    ),
                    occupied_by: None,
                }
            })
            .collect();
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Index of the first unoccupied slot, in creation order.
    pub fn find_free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Slot::is_free)
    }

    /// Index of the slot held by `key`.
    pub fn slot_of(&self, key: &DecorKey) -> Option<usize> {
        self.slots.iter().position(|s| s.occupied_by.as_ref() == Some(key))
    }

    /// Claim slot `index` for `key`, place `body` above it with a small random
    /// X/Z jitter, then hand it to `drop` to settle onto the surface.
    ///
    /// Returns `false` (and touches nothing) if the slot doesn't exist or is
    /// held by another key. A key moving to a new slot releases its old one.
    pub fn occupy_slot(
        &mut self,
        index: usize,
        key: &DecorKey,
        body: &mut DecorBody,
        rng: &mut impl Rng,
        drop: impl FnOnce(&mut DecorBody),
    ) -> bool {
        match self.slots.get(index).map(|s| s.occupied_by.as_ref()) {
            None => return false,
            Some(Some(other)) if other != key => return false,
            _ => {}
        }
        if let Some(prev) = self.slot_of(key) {
            self.slots[prev].occupied_by = None;
        }

        let slot = &mut self.slots[index];
        slot.occupied_by = Some(key.clone());

        let jx = (rng.random::<f32>() - 0.5) * JITTER_SPAN;
        let jz = (rng.random::<f32>() - 0.5) * JITTER_SPAN;
        body.transform.translation = Vec3::new(
            slot.position.x + jx,
            slot.position.y + PROVISIONAL_LIFT,
            slot.position.z + jz,
        );

        drop(body);
        true
    }

    /// Release whatever slot `key` holds. Returns the freed index.
    pub fn free_slot_by_key(&mut self, key: &DecorKey) -> Option<usize> {
        let index = self.slot_of(key)?;
        self.slots[index].occupied_by = None;
        Some(index)
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }
}
