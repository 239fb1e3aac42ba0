//! The vector store: metadata, index and identity map kept in step.

pub mod fallback;
mod paths;
mod types;
mod vector_store;

pub use fallback::{DebateLink, ImagePlan, LinkStrategy, Outcome, QueryPlan, QueryStrategy};
pub use paths::{StorePaths, canonicalize_image_path, remove_media_file};
pub use types::{DebateDeletion, DebateDetail, DebateSummary, ImageHit, StoreStats, TextSearch};
pub use vector_store::VectorStore;
