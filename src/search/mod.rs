//! Semantic search against an embedded index.
//!
//! - **[`session`]**: the interactive query loop and its terminal backends.

pub mod session;

use anyhow::Result;

use crate::embed::Embedder;
use crate::es::{KnnBackend, KnnQuery, SearchHit};

pub use session::{InteractiveTerminal, ScriptedTerminal, SessionStats, Terminal, run_session};

/// Hits requested from the engine.
pub const DEFAULT_K: usize = 5;
/// Candidates considered per shard.
pub const DEFAULT_NUM_CANDIDATES: usize = 5;
/// Hits shown to the user.
pub const DEFAULT_TOP: usize = 3;

/// Embeds queries and runs kNN searches on one index.
pub struct SemanticSearcher<'a, B: KnnBackend + ?Sized> {
    backend: &'a B,
    embedder: Box<dyn Embedder>,
    index: String,
    k: usize,
    num_candidates: usize,
}

impl<'a, B: KnnBackend + ?Sized> SemanticSearcher<'a, B> {
    pub fn new(backend: &'a B, embedder: Box<dyn Embedder>, index: impl Into<String>) -> Self {
        Self {
            backend,
            embedder,
            index: index.into(),
            k: DEFAULT_K,
            num_candidates: DEFAULT_NUM_CANDIDATES,
        }
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    pub fn with_num_candidates(mut self, num_candidates: usize) -> Self {
        self.num_candidates = num_candidates;
        self
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn search(&mut self, query: &str) -> Result<Vec<SearchHit>> {
        let query_vector = self.embedder.embed(query)?;
        let knn = KnnQuery::new(query_vector, self.k, self.num_candidates);
        tracing::debug!(
            index = %self.index,
            k = knn.k,
            num_candidates = knn.num_candidates,
            "running knn search"
        );
        Ok(self.backend.knn_search(&self.index, &knn)?)
    }
}

/// Render up to `top` hits as `Result {n}: {text}` / `score: {score}` pairs.
pub fn format_results(hits: &[SearchHit], top: usize) -> Vec<String> {
    if hits.is_empty() || top == 0 {
        return vec!["No results.".to_string()];
    }
    hits.iter()
        .take(top)
        .enumerate()
        .flat_map(|(n, hit)| {
            [
                format!("Result {}: {}", n + 1, hit.sentence_text),
                format!("score: {}", hit.score),
            ]
        })
        .collect()
}
