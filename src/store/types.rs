//! Values returned by the vector store.

use serde::Serialize;

use crate::metadata::{Debate, Image};
use crate::store::fallback::QueryStrategy;
use crate::{DebateId, ImageId};

/// One image-level search result joined with its debate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageHit {
    pub image_id: ImageId,
    pub image_path: String,
    pub ocr: String,
    pub debate_id: Option<DebateId>,
    pub tldr: Option<String>,
    pub summary: Option<String>,

    /// Inner product for vector hits, token overlap for lexical hits
    pub score: f32,

    /// `1 - score`, never negative; smaller is closer
    pub distance: f32,
}

/// Results of a text query and the strategy that produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSearch {
    pub strategy: QueryStrategy,
    pub hits: Vec<ImageHit>,
}

/// A debate with all of its images.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebateDetail {
    pub debate: Debate,

    /// Ascending id order
    pub images: Vec<Image>,

    /// Image with the highest id
    pub latest_image: Option<Image>,
}

/// A debate with the path of its latest image, for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebateSummary {
    pub debate: Debate,
    pub image_path: Option<String>,
}

/// What a debate deletion removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DebateDeletion {
    pub images: usize,
    pub vectors: usize,
    pub files: usize,
}

/// Sizes of the stores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub debates: usize,
    pub images: usize,

    /// Live index slots
    pub vectors: usize,

    /// Removed index slots still occupying space in the snapshot
    pub tombstones: usize,
}
