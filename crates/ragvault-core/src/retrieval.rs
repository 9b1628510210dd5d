//! Dual-embedding retrieval.
//!
//! A query is embedded with both the code model and the text model, each
//! vector searches the store, and the two candidate lists are merged:
//!
//! 1. Dedup on `(file_path, first 100 chars of text)`; the lower distance
//!    wins and its space is recorded.
//! 2. `score = clamp(1 - distance, 0, 1)`, then `min(1, score + score_boost)`
//!    floored at 0.
//! 3. Sort descending; rerank and keep the top N, or truncate to N.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ragvault_db::vector::VectorHit;

use crate::config::IndexConfig;
use crate::constants::DEDUP_PREFIX_CHARS;
use crate::engine::{check_dimension, RagEngine};
use crate::errors::RagError;
use crate::types::{IndexRecord, RecordType};

// ============================================================================
// Types
// ============================================================================

/// Embedding space a hit was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSpace {
    Code,
    Text,
}

impl fmt::Display for EmbeddingSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// A ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub text: String,
    pub file_path: String,
    /// Boosted similarity in `[0, 1]`.
    pub score: f32,
    pub space: EmbeddingSpace,
    /// Reranker score when reranking ran.
    pub rerank_score: Option<f32>,
    pub record_type: RecordType,
    pub source: String,
    pub priority: i32,
    pub score_boost: f32,
    pub indexed_at: DateTime<Utc>,
    pub message_id: Option<String>,
    pub tags: Vec<String>,
    pub heading: Option<String>,
}

impl SearchHit {
    fn from_vector_hit(hit: VectorHit, space: EmbeddingSpace) -> Self {
        let record = IndexRecord::from_stored(hit.record);
        let meta = record.metadata;
        Self {
            score: boosted_score(hit.distance, meta.score_boost),
            text: record.text,
            file_path: record.file_path,
            space,
            rerank_score: None,
            record_type: meta.record_type,
            source: meta.source,
            priority: meta.priority,
            score_boost: meta.score_boost,
            indexed_at: meta.indexed_at,
            message_id: meta.message_id,
            tags: meta.tags,
            heading: meta.heading,
        }
    }
}

/// Result of [`RagEngine::search`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub duration_ms: u64,
    /// Distinct files among the results.
    pub sources_count: usize,
    pub chunks_count: usize,
    /// Set when there was nothing to search.
    pub message: Option<String>,
}

// ============================================================================
// Scoring
// ============================================================================

/// Convert a cosine distance to a boosted score in `[0, 1]`.
pub fn boosted_score(distance: f32, boost: f32) -> f32 {
    let base = if distance.is_finite() {
        (1.0 - distance).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let boost = if boost.is_finite() { boost } else { 0.0 };
    (base + boost).clamp(0.0, 1.0)
}

fn dedup_key(file_path: &str, text: &str) -> (String, String) {
    (
        file_path.to_string(),
        text.chars().take(DEDUP_PREFIX_CHARS).collect(),
    )
}

/// Merge hits from both spaces, keeping the closest copy of each chunk,
/// and sort by boosted score.
pub fn merge_hits(code_hits: Vec<VectorHit>, text_hits: Vec<VectorHit>) -> Vec<SearchHit> {
    let mut merged: Vec<(VectorHit, EmbeddingSpace)> = Vec::new();
    let mut seen: HashMap<(String, String), usize> = HashMap::new();

    let spaces = [
        (EmbeddingSpace::Code, code_hits),
        (EmbeddingSpace::Text, text_hits),
    ];
    for (space, hits) in spaces {
        for hit in hits {
            let key = dedup_key(&hit.record.file_path, &hit.record.text);
            match seen.get(&key) {
                Some(&i) => {
                    if hit.distance < merged[i].0.distance {
                        merged[i] = (hit, space);
                    }
                }
                None => {
                    seen.insert(key, merged.len());
                    merged.push((hit, space));
                }
            }
        }
    }

    let mut results: Vec<SearchHit> = merged
        .into_iter()
        .map(|(hit, space)| SearchHit::from_vector_hit(hit, space))
        .collect();
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    results
}

// ============================================================================
// Search
// ============================================================================

impl RagEngine {
    /// Search the store with both embedding models.
    ///
    /// Both query vectors are checked against the configured dimension before
    /// the store is touched. An empty store returns an empty response with a
    /// message, not an error.
    pub async fn search(&self, query: &str) -> Result<SearchResponse, RagError> {
        let started = Instant::now();
        let config = self.config().await;

        if query.trim().is_empty() {
            return Ok(SearchResponse {
                message: Some("Empty query".to_string()),
                ..Default::default()
            });
        }

        let (code_vector, text_vector) = tokio::try_join!(
            self.embedder.embed(query, &config.code_model),
            self.embedder.embed(query, &config.text_model),
        )?;
        check_dimension(config.dimension, &code_vector)?;
        check_dimension(config.dimension, &text_vector)?;

        let store = self.store().await?;
        if store.is_empty().await? {
            return Ok(SearchResponse {
                duration_ms: started.elapsed().as_millis() as u64,
                message: Some(
                    "The store is empty. Index some documents first.".to_string(),
                ),
                ..Default::default()
            });
        }

        let k = config.retrieve_top_k;
        let (code_hits, text_hits) = tokio::try_join!(
            store.search(&code_vector, k),
            store.search(&text_vector, k),
        )?;
        tracing::debug!(
            "Query hits: {} code, {} text",
            code_hits.len(),
            text_hits.len()
        );

        let mut candidates = merge_hits(code_hits, text_hits);
        let results = if config.use_reranking && !candidates.is_empty() {
            self.rerank(query, candidates, &config).await?
        } else {
            candidates.truncate(config.rerank_top_n);
            candidates
        };

        let sources: HashSet<&str> = results.iter().map(|h| h.file_path.as_str()).collect();
        let response = SearchResponse {
            sources_count: sources.len(),
            chunks_count: results.len(),
            duration_ms: started.elapsed().as_millis() as u64,
            results,
            message: None,
        };

        tracing::info!(
            "Search returned {} chunks from {} sources in {}ms",
            response.chunks_count,
            response.sources_count,
            response.duration_ms
        );
        Ok(response)
    }

    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchHit>,
        config: &IndexConfig,
    ) -> Result<Vec<SearchHit>, RagError> {
        let reranker = self.reranker_for(config);
        let texts: Vec<String> = candidates.iter().map(|h| h.text.clone()).collect();
        let ranked = reranker
            .rerank(query, &texts, self.settings().indexer.embed_concurrency)
            .await?;

        let mut slots: Vec<Option<SearchHit>> = candidates.into_iter().map(Some).collect();
        let results = ranked
            .into_iter()
            .filter_map(|(index, score)| {
                let mut hit = slots.get_mut(index)?.take()?;
                hit.rerank_score = Some(score);
                Some(hit)
            })
            .take(config.rerank_top_n)
            .collect();

        tracing::debug!("Reranked with {}", reranker.model_id());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragvault_db::vector::StoredRecord;
    use serde_json::json;

    fn hit(path: &str, text: &str, distance: f32, boost: f32) -> VectorHit {
        let record = StoredRecord::new(format!("{path}-{distance}"), vec![0.0], text, path)
            .with_payload(json!({ "scoreBoost": boost, "source": path }));
        VectorHit::new(record, distance)
    }

    #[test]
    fn test_boosted_score_bounds() {
        assert_eq!(boosted_score(0.0, 0.0), 1.0);
        assert_eq!(boosted_score(1.5, 0.0), 0.0);
        assert_eq!(boosted_score(0.2, 0.5), 1.0);
        assert_eq!(boosted_score(0.9, -0.5), 0.0);
        assert_eq!(boosted_score(f32::NAN, 0.3), 0.3);
        assert!((boosted_score(0.25, 0.1) - 0.85).abs() < 1e-6);
    }

    #[test]
    fn test_merge_dedups_and_keeps_lower_distance() {
        let shared = "fn parse(input: &str) -> Result<Ast, Error>";
        let code = vec![hit("src/parse.rs", shared, 0.1, 0.0)];
        let text = vec![
            hit("src/parse.rs", shared, 0.3, 0.0),
            hit("docs/guide.md", "Parsing is done in two passes.", 0.2, 0.0),
        ];

        let merged = merge_hits(code, text);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].file_path, "src/parse.rs");
        assert_eq!(merged[0].space, EmbeddingSpace::Code);
        assert!((merged[0].score - 0.9).abs() < 1e-6);
        assert_eq!(merged[1].space, EmbeddingSpace::Text);
    }

    #[test]
    fn test_merge_dedup_uses_text_prefix() {
        let prefix = "x".repeat(DEDUP_PREFIX_CHARS);
        let a = format!("{prefix} tail one");
        let b = format!("{prefix} tail two");
        let merged = merge_hits(
            vec![hit("a.txt", &a, 0.4, 0.0)],
            vec![
                hit("a.txt", &b, 0.2, 0.0),
                hit("b.txt", &a, 0.5, 0.0),
            ],
        );
        // same file + same prefix collapse; other file stays
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].text, b);
        assert_eq!(merged[0].space, EmbeddingSpace::Text);
    }

    #[test]
    fn test_boost_reorders() {
        let merged = merge_hits(
            vec![
                hit("plain.md", "an ordinary chunk of text", 0.2, 0.0),
                hit("pinned://m1", "a pinned note to remember", 0.4, 0.5),
            ],
            Vec::new(),
        );
        assert_eq!(merged[0].file_path, "pinned://m1");
        assert_eq!(merged[0].score, 1.0);
        assert!(merged.iter().all(|h| (0.0..=1.0).contains(&h.score)));
    }
}
