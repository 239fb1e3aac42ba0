//! Vector store and hybrid search engine for debates and their images.
//!
//! Debates are short titled records; images carry a text description whose
//! embedding lives in a flat inner-product index. [`VectorStore`] keeps the
//! SQLite metadata, the index and the slot bindings consistent, and
//! [`HybridSearchEngine`] ranks debates by fusing vector similarity with
//! lexical matches.

pub mod config;
pub mod describe;
pub mod display;
pub mod error;
pub mod io;
pub mod logging;
pub mod metadata;
pub mod search;
pub mod store;
pub mod types;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use describe::{
    DescribeError, Describer, ImageDescription, InstructionDescription, ProvidedDescriber,
};
pub use error::{StoreError, StoreResult};
pub use metadata::{Debate, Image, MetadataError, MetadataStore};
pub use search::{DebateResult, HybridSearchEngine};
pub use store::{
    DebateDeletion, DebateDetail, DebateSummary, ImageHit, QueryStrategy, StorePaths, StoreStats,
    TextSearch, VectorStore,
};
pub use types::{DebateId, ImageId};
pub use vector::{Embedder, FastEmbedder, Slot, VectorDimension, VectorError, VectorIndex};
