//! Vector storage and similarity search for image descriptions.
//!
//! # Architecture
//! A flat inner-product index holds one unit vector per slot and is searched
//! exhaustively. Slots are tombstoned on removal and never reused, so a slot
//! identifies the same vector for as long as the index lives. The
//! [`IdentityMap`] ties slots to image rows and is rebuilt from the index and
//! the metadata store on startup.
//!
//! The index is persisted as a single snapshot file that is rewritten after
//! every mutation.

mod embedding;
mod identity;
mod index;
pub mod math;
mod snapshot;
mod types;

pub use embedding::{
    Embedder, FastEmbedder, LazyFastEmbedder, default_models_dir, model_to_string, parse_embedding_model,
};
pub use identity::{IdentityMap, RebuildReport};
pub use index::VectorIndex;
pub use snapshot::{Snapshot, read_snapshot, write_snapshot};
pub use types::{Score, Slot, VECTOR_DIMENSION_1024, VectorDimension, VectorError};
