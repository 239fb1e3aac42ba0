//! Bidirectional mapping between image rows and index slots.
//!
//! The map has no file of its own. It is rebuilt at startup by pairing the
//! live slots of the loaded index with the vector-bearing image rows, both in
//! ascending order. That pairing holds because slots are assigned in
//! insertion order, image ids grow monotonically, and both happen under the
//! same mutation lock.

use std::collections::HashMap;

use crate::ImageId;
use crate::vector::Slot;

/// Slot <-> image id lookup table.
#[derive(Debug, Default, Clone)]
pub struct IdentityMap {
    slot_to_image: HashMap<Slot, ImageId>,
    image_to_slot: HashMap<ImageId, Slot>,
}

/// Outcome of [`IdentityMap::rebuild`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Number of bindings created
    pub bound: usize,

    /// Live slots left without an image row
    pub orphan_slots: Vec<Slot>,

    /// Vector-bearing image rows left without a live slot
    pub orphan_images: Vec<ImageId>,
}

impl RebuildReport {
    /// True when every live slot and every vector-bearing row got a partner.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.orphan_slots.is_empty() && self.orphan_images.is_empty()
    }
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the map from ascending live slots and ascending image ids.
    ///
    /// Pairs are formed positionally. Surplus entries on either side are
    /// reported instead of bound.
    pub fn rebuild(
        live_slots: impl IntoIterator<Item = Slot>,
        image_ids: impl IntoIterator<Item = ImageId>,
    ) -> (Self, RebuildReport) {
        let mut map = Self::new();
        let mut report = RebuildReport::default();

        let mut slots = live_slots.into_iter();
        let mut images = image_ids.into_iter();

        loop {
            match (slots.next(), images.next()) {
                (Some(slot), Some(image_id)) => {
                    map.bind(slot, image_id);
                    report.bound += 1;
                }
                (Some(slot), None) => report.orphan_slots.push(slot),
                (None, Some(image_id)) => report.orphan_images.push(image_id),
                (None, None) => break,
            }
        }

        (map, report)
    }

    /// Binds `slot` to `image_id`, replacing any previous binding of either.
    pub fn bind(&mut self, slot: Slot, image_id: ImageId) {
        if let Some(previous_image) = self.slot_to_image.insert(slot, image_id) {
            self.image_to_slot.remove(&previous_image);
        }
        if let Some(previous_slot) = self.image_to_slot.insert(image_id, slot) {
            if previous_slot != slot {
                self.slot_to_image.remove(&previous_slot);
            }
        }
    }

    /// Slot currently holding the vector of `image_id`.
    #[must_use]
    pub fn slot_for(&self, image_id: ImageId) -> Option<Slot> {
        self.image_to_slot.get(&image_id).copied()
    }

    /// Image owning the vector at `slot`.
    #[must_use]
    pub fn image_for(&self, slot: Slot) -> Option<ImageId> {
        self.slot_to_image.get(&slot).copied()
    }

    /// Removes the binding of `image_id`, returning its slot.
    pub fn unbind(&mut self, image_id: ImageId) -> Option<Slot> {
        let slot = self.image_to_slot.remove(&image_id)?;
        self.slot_to_image.remove(&slot);
        Some(slot)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.image_to_slot.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_to_slot.is_empty()
    }

    /// Removes every binding.
    pub fn clear(&mut self) {
        self.slot_to_image.clear();
        self.image_to_slot.clear();
    }
}
