//! Flat inner-product index over unit vectors.
//!
//! Vectors live in one contiguous buffer, one fixed-size row per slot. Search
//! is exhaustive, which is exact and fast enough for the collection sizes this
//! store targets.
//!
//! Removal tombstones a slot instead of compacting the buffer, so every slot
//! handed out by [`VectorIndex::insert`] keeps pointing at the same vector for
//! the lifetime of the index.

use std::path::Path;

use crate::vector::math::inner_product;
use crate::vector::snapshot::{read_snapshot, write_snapshot};
use crate::vector::{Score, Slot, VectorDimension, VectorError};

/// Dense vector index with tombstoned removal.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    /// Row-major vector data, `dimension` floats per slot
    data: Vec<f32>,

    /// Liveness flag per slot
    live: Vec<bool>,

    /// Number of live slots
    live_count: usize,

    /// Vector dimension for validation
    dimension: VectorDimension,
}

impl VectorIndex {
    /// Creates an empty index for vectors of `dimension`.
    #[must_use]
    pub fn new(dimension: VectorDimension) -> Self {
        Self {
            data: Vec::new(),
            live: Vec::new(),
            live_count: 0,
            dimension,
        }
    }

    /// Appends a vector and returns its slot.
    ///
    /// The caller must pass a unit-length vector; the index does not
    /// normalize. Vectors of the wrong dimension are rejected.
    pub fn insert(&mut self, vector: &[f32]) -> Result<Slot, VectorError> {
        self.dimension.validate_vector(vector)?;

        let position = u32::try_from(self.live.len()).map_err(|_| {
            VectorError::InvalidFormat("vector index is full (u32 slot space exhausted)".into())
        })?;

        self.data.extend_from_slice(vector);
        self.live.push(true);
        self.live_count += 1;

        Ok(Slot::new(position))
    }

    /// Returns up to `k` live slots ordered by descending inner product.
    ///
    /// Ties keep ascending slot order. The query must be unit length.
    #[must_use = "Search results should be processed to retrieve relevant vectors"]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(Slot, Score)>, VectorError> {
        self.dimension.validate_vector(query)?;

        if k == 0 || self.live_count == 0 {
            return Ok(Vec::new());
        }

        let dim = self.dimension.get();
        let mut candidates: Vec<(Slot, Score)> = self
            .live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .filter_map(|(position, _)| {
                let row = &self.data[position * dim..(position + 1) * dim];
                let score = Score::new(inner_product(query, row)).ok()?;
                Some((Slot::new(position as u32), score))
            })
            .collect();

        // Stable sort keeps slot order for equal scores
        candidates.sort_by(|a, b| b.1.cmp(&a.1));
        candidates.truncate(k);

        Ok(candidates)
    }

    /// Tombstones `slot`.
    ///
    /// Returns `true` when a live vector was removed and `false` when the slot
    /// was already removed. Other slots keep their positions.
    pub fn remove(&mut self, slot: Slot) -> Result<bool, VectorError> {
        let position = slot.as_index();
        let Some(live) = self.live.get_mut(position) else {
            return Err(VectorError::SlotOutOfRange {
                slot: slot.get(),
                len: self.live.len(),
            });
        };

        if !*live {
            return Ok(false);
        }

        *live = false;
        self.live_count -= 1;

        let dim = self.dimension.get();
        self.data[position * dim..(position + 1) * dim].fill(0.0);

        Ok(true)
    }

    /// Total number of slots, removed ones included.
    #[must_use]
    pub fn size(&self) -> usize {
        self.live.len()
    }

    /// Number of slots holding a vector.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live_count
    }

    /// Number of removed slots.
    #[must_use]
    pub fn tombstone_count(&self) -> usize {
        self.live.len() - self.live_count
    }

    /// Gets the vector dimension.
    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    /// True when `slot` exists and has not been removed.
    #[must_use]
    pub fn is_live(&self, slot: Slot) -> bool {
        self.live.get(slot.as_index()).copied().unwrap_or(false)
    }

    /// Returns the stored vector of a live slot.
    #[must_use]
    pub fn vector(&self, slot: Slot) -> Option<&[f32]> {
        if !self.is_live(slot) {
            return None;
        }
        let dim = self.dimension.get();
        let position = slot.as_index();
        Some(&self.data[position * dim..(position + 1) * dim])
    }

    /// Live slots in ascending order.
    pub fn live_slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.live
            .iter()
            .enumerate()
            .filter(|(_, live)| **live)
            .map(|(position, _)| Slot::new(position as u32))
    }

    /// Writes the whole index to `path`, replacing any previous snapshot.
    pub fn save_to_disk(&self, path: &Path) -> Result<(), VectorError> {
        self.save_to_disk_without(path, &[])
    }

    /// Writes the index with `removed` stored as tombstones.
    ///
    /// The in-memory index is untouched, so a failed write leaves nothing
    /// to undo.
    pub fn save_to_disk_without(&self, path: &Path, removed: &[Slot]) -> Result<(), VectorError> {
        let dim = self.dimension.get();
        let rows = self.live.iter().enumerate().map(|(position, live)| {
            let kept = *live && !removed.contains(&Slot::new(position as u32));
            kept.then(|| &self.data[position * dim..(position + 1) * dim])
        });

        write_snapshot(path, self.dimension, self.live.len(), rows)
    }

    /// Loads an index previously written by [`save_to_disk`](Self::save_to_disk).
    pub fn load_from_disk(path: &Path) -> Result<Self, VectorError> {
        let snapshot = read_snapshot(path)?;
        let dim = snapshot.dimension.get();

        let mut index = Self::new(snapshot.dimension);
        index.data.reserve(snapshot.slots.len() * dim);
        index.live.reserve(snapshot.slots.len());

        for slot in snapshot.slots {
            match slot {
                Some(vector) => {
                    index.data.extend_from_slice(&vector);
                    index.live.push(true);
                    index.live_count += 1;
                }
                None => {
                    index.data.resize(index.data.len() + dim, 0.0);
                    index.live.push(false);
                }
            }
        }

        Ok(index)
    }

    /// Loads the snapshot at `path`, or starts empty when none exists.
    ///
    /// A snapshot written with a different dimension is rejected.
    pub fn open_or_create(path: &Path, dimension: VectorDimension) -> Result<Self, VectorError> {
        if !path.exists() {
            return Ok(Self::new(dimension));
        }

        let index = Self::load_from_disk(path)?;
        if index.dimension != dimension {
            return Err(VectorError::DimensionMismatch {
                expected: dimension.get(),
                actual: index.dimension.get(),
            });
        }
        Ok(index)
    }
}
