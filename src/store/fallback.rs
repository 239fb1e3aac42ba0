//! Ordered fallback chains used by the store.
//!
//! Each chain is a fixed list of strategies tried in order. A strategy either
//! produces a value, declares itself not applicable, or fails; the chain
//! stops at the first success and logs the rest.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, warn};

use crate::describe::{Describer, ImageDescription};
use crate::error::{StoreError, StoreResult};
use crate::metadata::MetadataStore;
use crate::vector::{Embedder, VectorDimension, math};
use crate::DebateId;

/// Result of one strategy in a chain.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The strategy produced a value; later strategies are not tried
    Success(T),

    /// The strategy does not apply to this input
    Skip(&'static str),

    /// The strategy applied and failed
    Fail(StoreError),
}

// ---------------------------------------------------------------
// Debate linkage
// ---------------------------------------------------------------

/// How an image got attached to its debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    /// The requested debate exists
    Requested,

    /// Substituted the most recently created debate
    LatestDebate,

    /// No debate exists; the image is stored unlinked
    Unresolved,
}

/// Debate an image will be stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebateLink {
    pub debate_id: Option<DebateId>,
    pub strategy: LinkStrategy,
}

impl LinkStrategy {
    /// Strategies that can produce a debate, in order.
    pub const CHAIN: [LinkStrategy; 2] = [LinkStrategy::Requested, LinkStrategy::LatestDebate];

    fn attempt(self, metadata: &MetadataStore, requested: Option<DebateId>) -> Outcome<DebateId> {
        match self {
            LinkStrategy::Requested => {
                let Some(id) = requested else {
                    return Outcome::Skip("no debate id given");
                };
                match metadata.debate_exists(id) {
                    Ok(true) => Outcome::Success(id),
                    Ok(false) => Outcome::Skip("requested debate does not exist"),
                    Err(e) => Outcome::Fail(e.into()),
                }
            }
            LinkStrategy::LatestDebate => match metadata.latest_debate_id() {
                Ok(Some(id)) => Outcome::Success(id),
                Ok(None) => Outcome::Skip("no debates exist"),
                Err(e) => Outcome::Fail(e.into()),
            },
            LinkStrategy::Unresolved => Outcome::Skip("unresolved links carry no debate"),
        }
    }
}

/// Pick the debate for a new image.
///
/// Never rejects: when neither the requested nor any other debate exists the
/// link is [`LinkStrategy::Unresolved`].
pub fn resolve_debate_link(metadata: &MetadataStore, requested: Option<DebateId>) -> DebateLink {
    for strategy in LinkStrategy::CHAIN {
        match strategy.attempt(metadata, requested) {
            Outcome::Success(id) => {
                if strategy != LinkStrategy::Requested {
                    warn!(
                        requested = ?requested.map(|id| id.value()),
                        substituted = id.value(),
                        "Debate not found, attaching image to the latest debate"
                    );
                }
                return DebateLink {
                    debate_id: Some(id),
                    strategy,
                };
            }
            Outcome::Skip(reason) => debug!(?strategy, reason, "Debate link strategy skipped"),
            Outcome::Fail(e) => warn!(?strategy, error = %e, "Debate link strategy failed"),
        }
    }

    warn!(
        requested = ?requested.map(|id| id.value()),
        "No debate exists, storing image without a debate"
    );
    DebateLink {
        debate_id: None,
        strategy: LinkStrategy::Unresolved,
    }
}

// ---------------------------------------------------------------
// Text queries
// ---------------------------------------------------------------

/// How a text query was turned into results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStrategy {
    /// Embedded the describer's normalized instruction
    Instruction,

    /// Embedded the query as given
    RawText,

    /// Token overlap over stored text, no embedding
    Lexical,
}

/// What to run for a text query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPlan {
    /// Nearest-neighbor search with a unit-length query vector
    Vector {
        strategy: QueryStrategy,
        vector: Vec<f32>,
    },

    /// Lexical fallback search
    Lexical,
}

impl QueryStrategy {
    /// Strategies that produce a query vector, in order.
    pub const CHAIN: [QueryStrategy; 2] = [QueryStrategy::Instruction, QueryStrategy::RawText];

    fn attempt(
        self,
        query: &str,
        describer: &dyn Describer,
        embedder: &dyn Embedder,
        dimension: VectorDimension,
    ) -> Outcome<Vec<f32>> {
        let text = match self {
            QueryStrategy::Instruction => match describer.describe_instruction(query) {
                Ok(instruction) if instruction.normalized_text == query => {
                    return Outcome::Skip("instruction already normalized");
                }
                Ok(instruction) => instruction.normalized_text,
                Err(e) => return Outcome::Fail(e.into()),
            },
            QueryStrategy::RawText => query.to_string(),
            QueryStrategy::Lexical => return Outcome::Skip("lexical search needs no vector"),
        };

        match embed_normalized(embedder, &text, dimension) {
            Ok(vector) => Outcome::Success(vector),
            Err(e) => Outcome::Fail(e),
        }
    }
}

/// Decide how to search for `query`.
///
/// Runs before the store lock is taken, since describer and embedder calls
/// may be slow.
pub fn plan_text_query(
    query: &str,
    describer: &dyn Describer,
    embedder: &dyn Embedder,
    dimension: VectorDimension,
) -> QueryPlan {
    for strategy in QueryStrategy::CHAIN {
        match strategy.attempt(query, describer, embedder, dimension) {
            Outcome::Success(vector) => return QueryPlan::Vector { strategy, vector },
            Outcome::Skip(reason) => debug!(?strategy, reason, "Query strategy skipped"),
            Outcome::Fail(e) => warn!(?strategy, error = %e, "Query strategy failed"),
        }
    }

    warn!("Embedding unavailable, falling back to lexical search");
    QueryPlan::Lexical
}

// ---------------------------------------------------------------
// Image processing
// ---------------------------------------------------------------

/// What to store for an uploaded image.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagePlan {
    /// Description and unit-length vector are available
    Described {
        description: ImageDescription,
        vector: Vec<f32>,
    },

    /// Store the path only
    VectorLess { reason: String },
}

/// Describe and embed an image, degrading to a vector-less plan on failure.
pub fn plan_image(
    media_file: &Path,
    describer: &dyn Describer,
    embedder: &dyn Embedder,
    dimension: VectorDimension,
) -> ImagePlan {
    let description = match describer.describe_image(media_file) {
        Ok(description) => description,
        Err(e) => {
            warn!(path = %media_file.display(), error = %e, "Image description failed, storing without vector");
            return ImagePlan::VectorLess {
                reason: e.to_string(),
            };
        }
    };

    match embed_normalized(embedder, &description.description, dimension) {
        Ok(vector) => ImagePlan::Described {
            description,
            vector,
        },
        Err(e) => {
            warn!(path = %media_file.display(), error = %e, "Image embedding failed, storing without vector");
            ImagePlan::VectorLess {
                reason: e.to_string(),
            }
        }
    }
}

/// Embed `text` and normalize the result for the index.
fn embed_normalized(
    embedder: &dyn Embedder,
    text: &str,
    dimension: VectorDimension,
) -> StoreResult<Vec<f32>> {
    let raw = embedder
        .embed(text)
        .map_err(|e| StoreError::EmbeddingFailed(e.to_string()))?;
    math::normalize(&raw, dimension).map_err(StoreError::InvalidVector)
}
