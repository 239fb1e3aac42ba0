//! Hybrid search over debates.
//!
//! [`lexical`] holds the pure scoring functions; [`HybridSearchEngine`]
//! combines them with vector hits from the store.

mod hybrid;
pub mod lexical;

pub use hybrid::{DEFAULT_VECTOR_K, DebateResult, HybridResults, HybridSearchEngine};
pub use lexical::{distance_to_similarity, fuse, jaccard_score, lexical_boost};
