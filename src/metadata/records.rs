//! Row types of the metadata store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{DebateId, ImageId};

/// A titled record owning zero or more images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debate {
    pub id: DebateId,

    /// Short title, never empty
    pub tldr: String,

    /// Free text, may be empty
    pub summary: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An uploaded image and the text extracted from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,

    /// Owning debate; `None` when the image was stored before any debate existed
    pub debate_id: Option<DebateId>,

    /// Canonical path relative to the media root
    pub image_path: String,

    /// Extracted terms, empty when description failed
    pub ocr: String,

    /// Whether a vector for this image lives in the index
    pub has_vector: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An image joined with its owning debate, if that debate exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWithDebate {
    pub image: Image,
    pub debate: Option<Debate>,
}
