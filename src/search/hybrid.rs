//! Debate-level ranking that fuses vector similarity with lexical matches.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::StoreResult;
use crate::search::lexical::{distance_to_similarity, fuse, lexical_boost};
use crate::store::{QueryStrategy, TextSearch, VectorStore};
use crate::DebateId;

/// Default number of image hits considered per query.
pub const DEFAULT_VECTOR_K: usize = 20;

/// A debate with its fused score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebateResult {
    pub id: DebateId,
    pub tldr: String,
    pub summary: String,
    pub created_at: DateTime<Utc>,

    /// Latest image of the debate
    pub image_path: Option<String>,

    pub score: f32,
}

/// Ranked debates and how the image hits were obtained.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HybridResults {
    pub strategy: QueryStrategy,
    pub debates: Vec<DebateResult>,
}

/// Ranks debates for a free-text query.
///
/// Reads through the store only; never mutates it.
#[derive(Debug)]
pub struct HybridSearchEngine<'a> {
    store: &'a VectorStore,
    vector_k: usize,
}

impl<'a> HybridSearchEngine<'a> {
    pub fn new(store: &'a VectorStore) -> Self {
        Self {
            store,
            vector_k: DEFAULT_VECTOR_K,
        }
    }

    /// Number of image hits fetched before grouping by debate.
    #[must_use]
    pub fn with_vector_k(mut self, vector_k: usize) -> Self {
        self.vector_k = vector_k;
        self
    }

    /// Rank debates for `query`.
    ///
    /// A debate is relevant when its score is strictly above
    /// `minimum_score`. With `include_all` every debate is returned with its
    /// score, relevant or not. Results are sorted by descending score; equal
    /// scores keep most-recently-updated first.
    pub fn search(
        &self,
        query: &str,
        minimum_score: f32,
        include_all: bool,
    ) -> StoreResult<Vec<DebateResult>> {
        self.search_detailed(query, minimum_score, include_all)
            .map(|results| results.debates)
    }

    /// Like [`search`](Self::search), also reporting the query strategy.
    pub fn search_detailed(
        &self,
        query: &str,
        minimum_score: f32,
        include_all: bool,
    ) -> StoreResult<HybridResults> {
        let debates = self.store.list_debates()?;
        // Ranking degrades to lexical boosts alone when the text search fails
        let text_search = match self.store.search_by_text(query, self.vector_k) {
            Ok(found) => found,
            Err(e) => {
                warn!(query, error = %e, "Text search failed, ranking by lexical boost only");
                TextSearch {
                    strategy: QueryStrategy::Lexical,
                    hits: Vec::new(),
                }
            }
        };

        let mut vector_scores: HashMap<DebateId, f32> = HashMap::new();
        for hit in &text_search.hits {
            let Some(debate_id) = hit.debate_id else {
                continue;
            };
            let similarity = distance_to_similarity(hit.distance);
            vector_scores
                .entry(debate_id)
                .and_modify(|best| *best = best.max(similarity))
                .or_insert(similarity);
        }

        let mut results: Vec<DebateResult> = debates
            .into_iter()
            .filter_map(|summary| {
                let debate = summary.debate;
                let vector_score = vector_scores.get(&debate.id).copied().unwrap_or(0.0);
                let score = fuse(vector_score, lexical_boost(query, &debate.tldr, &debate.summary));

                if !include_all && score <= minimum_score {
                    return None;
                }

                Some(DebateResult {
                    id: debate.id,
                    tldr: debate.tldr,
                    summary: debate.summary,
                    created_at: debate.created_at,
                    image_path: summary.image_path,
                    score,
                })
            })
            .collect();

        // Stable: equal scores keep the listing order
        results.sort_by(|a, b| b.score.total_cmp(&a.score));

        debug!(
            query,
            strategy = ?text_search.strategy,
            hits = text_search.hits.len(),
            debates = results.len(),
            "Hybrid search finished"
        );

        Ok(HybridResults {
            strategy: text_search.strategy,
            debates: results,
        })
    }
}
