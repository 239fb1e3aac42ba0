//! The store that keeps metadata rows, index vectors and their bindings
//! consistent.
//!
//! Every mutation runs under one lock from validation to snapshot write, so
//! readers never observe a row without its vector binding or the reverse.
//! Describer and embedder calls happen before the lock is taken.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::describe::Describer;
use crate::error::{StoreError, StoreResult};
use crate::metadata::{Debate, Image, ImageWithDebate, MetadataStore};
use crate::search::lexical::{jaccard_score, tokenize};
use crate::store::fallback::{
    ImagePlan, QueryPlan, QueryStrategy, plan_image, plan_text_query, resolve_debate_link,
};
use crate::store::paths::{StorePaths, canonicalize_image_path, remove_if_exists, remove_media_file};
use crate::store::types::{
    DebateDeletion, DebateDetail, DebateSummary, ImageHit, StoreStats, TextSearch,
};
use crate::vector::{
    Embedder, IdentityMap, Slot, VectorDimension, VectorIndex, math,
};
use crate::{DebateId, ImageId};

/// State guarded by the store lock.
struct Inner {
    metadata: MetadataStore,
    index: VectorIndex,
    map: IdentityMap,
}

/// Debates, images and their vectors behind one consistent interface.
///
/// Construct one per process and share it by reference; all methods take
/// `&self`.
pub struct VectorStore {
    inner: Mutex<Inner>,
    paths: StorePaths,
    dimension: VectorDimension,
    embedder: Arc<dyn Embedder>,
    describer: Arc<dyn Describer>,
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore")
            .field("paths", &self.paths)
            .field("dimension", &self.dimension)
            .finish_non_exhaustive()
    }
}

impl VectorStore {
    /// Open the store described by `settings`.
    pub fn open(
        settings: &Settings,
        embedder: Arc<dyn Embedder>,
        describer: Arc<dyn Describer>,
    ) -> StoreResult<Self> {
        let dimension = VectorDimension::new(settings.store.dimension).map_err(|e| {
            StoreError::Config {
                reason: e.to_string(),
            }
        })?;
        Self::open_with(StorePaths::from_settings(settings), dimension, embedder, describer)
    }

    /// Load or create the database and index snapshot, then rebuild the
    /// identity map.
    ///
    /// Bindings that cannot be paired are repaired: surplus image rows are
    /// marked vector-less and surplus slots are removed from the index.
    pub fn open_with(
        paths: StorePaths,
        dimension: VectorDimension,
        embedder: Arc<dyn Embedder>,
        describer: Arc<dyn Describer>,
    ) -> StoreResult<Self> {
        if embedder.dimension() != dimension {
            return Err(StoreError::Config {
                reason: format!(
                    "embedder produces {}-dimensional vectors but the store expects {}",
                    embedder.dimension().get(),
                    dimension.get()
                ),
            });
        }

        let metadata = MetadataStore::open(&paths.database)?;
        let mut index = VectorIndex::open_or_create(&paths.index, dimension)?;

        let live_slots: Vec<Slot> = index.live_slots().collect();
        let image_ids = metadata.vector_image_ids()?;
        let (map, report) = IdentityMap::rebuild(live_slots, image_ids);

        if !report.is_consistent() {
            warn!(
                bound = report.bound,
                orphan_slots = report.orphan_slots.len(),
                orphan_images = report.orphan_images.len(),
                "Index and metadata disagree, repairing"
            );
            for image_id in &report.orphan_images {
                metadata.mark_vector_less(*image_id)?;
            }
            for slot in &report.orphan_slots {
                index.remove(*slot)?;
            }
            if !report.orphan_slots.is_empty() {
                index.save_to_disk(&paths.index)?;
            }
        }

        info!(
            database = %paths.database.display(),
            vectors = index.live_count(),
            tombstones = index.tombstone_count(),
            bound = map.len(),
            "Vector store opened"
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                metadata,
                index,
                map,
            }),
            paths,
            dimension,
            embedder,
            describer,
        })
    }

    #[must_use]
    pub fn dimension(&self) -> VectorDimension {
        self.dimension
    }

    #[must_use]
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    // ---------------------------------------------------------------
    // Debates
    // ---------------------------------------------------------------

    pub fn add_debate(&self, tldr: &str, summary: &str) -> StoreResult<DebateId> {
        let tldr = validate_tldr(tldr)?;
        let inner = self.inner.lock();
        let id = inner.metadata.create_debate(tldr, summary)?;
        debug!(debate_id = id.value(), "Created debate");
        Ok(id)
    }

    pub fn update_debate(&self, id: DebateId, tldr: &str, summary: &str) -> StoreResult<()> {
        let tldr = validate_tldr(tldr)?;
        let inner = self.inner.lock();
        inner.metadata.update_debate(id, tldr, summary)?;
        Ok(())
    }

    pub fn get_debate(&self, id: DebateId) -> StoreResult<Debate> {
        Ok(self.inner.lock().metadata.get_debate(id)?)
    }

    /// A debate with all its images and its latest image.
    pub fn debate_detail(&self, id: DebateId) -> StoreResult<DebateDetail> {
        let inner = self.inner.lock();
        let debate = inner.metadata.get_debate(id)?;
        let images = inner.metadata.list_images_for_debate(id)?;
        let latest_image = images.last().cloned();

        Ok(DebateDetail {
            debate,
            images,
            latest_image,
        })
    }

    /// All debates, most recently updated first, each with its latest image.
    pub fn list_debates(&self) -> StoreResult<Vec<DebateSummary>> {
        let inner = self.inner.lock();
        inner
            .metadata
            .list_debates()?
            .into_iter()
            .map(|debate| -> StoreResult<DebateSummary> {
                let image_path = inner
                    .metadata
                    .latest_image_for_debate(debate.id)?
                    .map(|image| image.image_path);
                Ok(DebateSummary { debate, image_path })
            })
            .collect()
    }

    // ---------------------------------------------------------------
    // Images
    // ---------------------------------------------------------------

    /// Store an image with a precomputed description vector.
    ///
    /// The debate id is repaired to the latest debate when it does not
    /// exist. The vector is normalized here; a wrong dimension or zero norm
    /// fails with [`StoreError::InvalidVector`] before anything is written.
    /// If the vector cannot be indexed after the row was written, the row is
    /// kept and marked vector-less.
    pub fn add_image_record(
        &self,
        debate_id: Option<DebateId>,
        image_path: &str,
        vector: &[f32],
        ocr: &str,
    ) -> StoreResult<ImageId> {
        let canonical = canonicalize_image_path(image_path)?;
        let unit = math::normalize(vector, self.dimension).map_err(StoreError::InvalidVector)?;

        let mut inner = self.inner.lock();
        self.insert_with_vector(&mut inner, debate_id, &canonical, &unit, ocr)
    }

    /// Describe, embed and store an uploaded image.
    ///
    /// Description or embedding failures store the image without a vector
    /// and with empty OCR text; the call still returns the new id.
    pub fn process_and_add_image(
        &self,
        debate_id: Option<DebateId>,
        image_path: &str,
    ) -> StoreResult<ImageId> {
        let canonical = canonicalize_image_path(image_path)?;
        let media_file = self.paths.media_file(&canonical);

        let plan = plan_image(
            &media_file,
            self.describer.as_ref(),
            self.embedder.as_ref(),
            self.dimension,
        );

        let mut inner = self.inner.lock();
        match plan {
            ImagePlan::Described {
                description,
                vector,
            } => self.insert_with_vector(
                &mut inner,
                debate_id,
                &canonical,
                &vector,
                &description.ocr_text(),
            ),
            ImagePlan::VectorLess { reason } => {
                let link = resolve_debate_link(&inner.metadata, debate_id);
                let image_id = inner
                    .metadata
                    .insert_image(link.debate_id, &canonical, "", false)?;
                info!(
                    image_id = image_id.value(),
                    reason = %reason,
                    "Stored image without vector"
                );
                Ok(image_id)
            }
        }
    }

    /// Row insert, index insert, bind and persist, under the caller's lock.
    fn insert_with_vector(
        &self,
        inner: &mut Inner,
        debate_id: Option<DebateId>,
        canonical: &str,
        unit: &[f32],
        ocr: &str,
    ) -> StoreResult<ImageId> {
        let link = resolve_debate_link(&inner.metadata, debate_id);
        let image_id = inner
            .metadata
            .insert_image(link.debate_id, canonical, ocr, true)?;

        match self.attach_vector(inner, image_id, unit) {
            Ok(slot) => {
                debug!(
                    image_id = image_id.value(),
                    slot = slot.get(),
                    debate_id = ?link.debate_id.map(|id| id.value()),
                    "Indexed image"
                );
            }
            Err(e) => {
                warn!(image_id = image_id.value(), error = %e, "Indexing failed, keeping image without vector");
                inner.metadata.mark_vector_less(image_id)?;
            }
        }

        Ok(image_id)
    }

    /// Insert into the index, bind, and persist; undone on failure.
    fn attach_vector(&self, inner: &mut Inner, image_id: ImageId, unit: &[f32]) -> StoreResult<Slot> {
        let slot = inner.index.insert(unit)?;
        inner.map.bind(slot, image_id);

        if let Err(e) = inner.index.save_to_disk(&self.paths.index) {
            inner.map.unbind(image_id);
            inner.index.remove(slot)?;
            return Err(e.into());
        }

        Ok(slot)
    }

    // ---------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------

    /// Nearest images to `query_vector`, best first, at most `k`.
    ///
    /// Slots without a binding or whose row disappeared are skipped.
    pub fn search(&self, query_vector: &[f32], k: usize) -> StoreResult<Vec<ImageHit>> {
        let unit = math::normalize(query_vector, self.dimension).map_err(StoreError::InvalidVector)?;
        let inner = self.inner.lock();
        Self::vector_search(&inner, &unit, k)
    }

    fn vector_search(inner: &Inner, unit: &[f32], k: usize) -> StoreResult<Vec<ImageHit>> {
        let candidates = inner.index.search(unit, k)?;
        let mut hits = Vec::with_capacity(candidates.len());

        for (slot, score) in candidates {
            let Some(image_id) = inner.map.image_for(slot) else {
                warn!(slot = slot.get(), "Skipping slot without image binding");
                continue;
            };
            let Some(row) = inner.metadata.image_with_debate(image_id)? else {
                warn!(
                    slot = slot.get(),
                    image_id = image_id.value(),
                    "Skipping slot bound to a missing image row"
                );
                continue;
            };
            hits.push(hit_from_row(row, score.get(), score.distance()));
        }

        Ok(hits)
    }

    /// Search by free text.
    ///
    /// Tries the normalized instruction, then the raw text, and falls back
    /// to lexical matching when no embedding can be produced.
    pub fn search_by_text(&self, query: &str, k: usize) -> StoreResult<TextSearch> {
        let plan = plan_text_query(
            query,
            self.describer.as_ref(),
            self.embedder.as_ref(),
            self.dimension,
        );

        let inner = self.inner.lock();
        match plan {
            QueryPlan::Vector { strategy, vector } => Ok(TextSearch {
                strategy,
                hits: Self::vector_search(&inner, &vector, k)?,
            }),
            QueryPlan::Lexical => Ok(TextSearch {
                strategy: QueryStrategy::Lexical,
                hits: Self::lexical_search(&inner, query, k)?,
            }),
        }
    }

    /// Token-overlap search over every image joined with its debate.
    fn lexical_search(inner: &Inner, query: &str, k: usize) -> StoreResult<Vec<ImageHit>> {
        let query_words = tokenize(query);
        if query_words.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<ImageHit> = inner
            .metadata
            .images_with_debates()?
            .into_iter()
            .filter_map(|row| {
                let debate = row.debate.as_ref()?;
                if debate.tldr.is_empty() || row.image.image_path.is_empty() {
                    return None;
                }
                let all_text = format!("{} {} {}", debate.tldr, debate.summary, row.image.ocr);
                let score = jaccard_score(&query_words, &all_text)?;
                Some(hit_from_row(row, score, 1.0 - score))
            })
            .collect();

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits.truncate(k);
        Ok(hits)
    }

    // ---------------------------------------------------------------
    // Deletion, lifecycle
    // ---------------------------------------------------------------

    /// Delete a debate, its images, their vectors and their media files.
    ///
    /// The row deletion stays uncommitted until a snapshot without the
    /// debate's slots is on disk, so a failed write leaves both stores as
    /// they were. Media files are removed last; failures there are logged
    /// only.
    pub fn delete_debate(&self, id: DebateId) -> StoreResult<DebateDeletion> {
        let mut inner = self.inner.lock();
        let Inner {
            metadata,
            index,
            map,
        } = &mut *inner;

        let images = metadata.list_images_for_debate(id)?;
        let pending = metadata.begin_debate_deletion(id)?;

        let mut slots = Vec::with_capacity(images.len());
        for image in &images {
            match map.slot_for(image.id) {
                Some(slot) if index.is_live(slot) => slots.push(slot),
                Some(slot) => warn!(slot = slot.get(), "Slot was already removed"),
                None if image.has_vector => {
                    warn!(image_id = image.id.value(), "Vector-bearing image had no binding");
                }
                None => {}
            }
        }

        if !slots.is_empty() {
            if let Err(e) = index.save_to_disk_without(&self.paths.index, &slots) {
                error!(error = %e, "Failed to persist index, keeping debate");
                return Err(e.into());
            }
        }

        let removed_rows = match pending.commit() {
            Ok(count) => count,
            Err(e) => {
                error!(error = %e, "Failed to commit debate deletion");
                if !slots.is_empty() {
                    if let Err(e) = index.save_to_disk(&self.paths.index) {
                        error!(error = %e, "Failed to restore index snapshot");
                    }
                }
                return Err(e.into());
            }
        };

        let mut deletion = DebateDeletion {
            images: removed_rows,
            ..DebateDeletion::default()
        };
        for image in &images {
            map.unbind(image.id);
        }
        for slot in slots {
            match index.remove(slot) {
                Ok(true) => deletion.vectors += 1,
                Ok(false) => warn!(slot = slot.get(), "Slot was already removed"),
                Err(e) => warn!(slot = slot.get(), error = %e, "Failed to remove slot"),
            }
        }
        drop(inner);

        deletion.files = images
            .iter()
            .filter(|image| remove_media_file(&self.paths.media_file(&image.image_path)))
            .count();

        info!(
            debate_id = id.value(),
            images = deletion.images,
            vectors = deletion.vectors,
            files = deletion.files,
            "Deleted debate"
        );
        Ok(deletion)
    }

    /// Current slot of an image's vector.
    #[must_use]
    pub fn slot_for(&self, image_id: ImageId) -> Option<Slot> {
        self.inner.lock().map.slot_for(image_id)
    }

    pub fn get_image(&self, image_id: ImageId) -> StoreResult<Image> {
        self.inner
            .lock()
            .metadata
            .get_image(image_id)?
            .ok_or(StoreError::NotFound {
                entity: "Image",
                id: image_id.value(),
            })
    }

    pub fn stats(&self) -> StoreResult<StoreStats> {
        let inner = self.inner.lock();
        Ok(StoreStats {
            debates: inner.metadata.count_debates()?,
            images: inner.metadata.count_images()?,
            vectors: inner.index.live_count(),
            tombstones: inner.index.tombstone_count(),
        })
    }

    /// Write the index snapshot and close the database connection.
    ///
    /// Every mutation already persists the snapshot, so dropping a store
    /// loses nothing; `close` additionally reports errors that a drop would
    /// swallow.
    pub fn close(self) -> StoreResult<()> {
        let Inner {
            metadata, index, ..
        } = self.inner.into_inner();

        index.save_to_disk(&self.paths.index)?;
        metadata.close()?;
        info!(index = %self.paths.index.display(), "Vector store closed");
        Ok(())
    }

    /// Delete the database and the index snapshot of a closed store.
    ///
    /// Returns the files that existed and were removed.
    pub fn reset(paths: &StorePaths) -> StoreResult<Vec<std::path::PathBuf>> {
        let mut candidates = vec![paths.database.clone(), paths.index.clone()];
        for suffix in ["-wal", "-shm"] {
            let mut sidecar = paths.database.clone().into_os_string();
            sidecar.push(suffix);
            candidates.push(sidecar.into());
        }

        let mut removed = Vec::new();
        for path in candidates {
            if remove_if_exists(&path)? {
                removed.push(path);
            }
        }

        info!(files = removed.len(), "Vector store reset");
        Ok(removed)
    }
}

fn validate_tldr(tldr: &str) -> StoreResult<&str> {
    let trimmed = tldr.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput {
            field: "tldr",
            reason: "must not be empty".to_string(),
        });
    }
    Ok(trimmed)
}

fn hit_from_row(row: ImageWithDebate, score: f32, distance: f32) -> ImageHit {
    let ImageWithDebate { image, debate } = row;
    ImageHit {
        image_id: image.id,
        image_path: image.image_path,
        ocr: image.ocr,
        debate_id: image.debate_id,
        tldr: debate.as_ref().map(|d| d.tldr.clone()),
        summary: debate.map(|d| d.summary),
        score,
        distance,
    }
}
