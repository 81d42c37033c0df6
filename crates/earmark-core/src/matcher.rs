//! Catalog matching by hash-set overlap.
//!
//! A candidate's score is the number of distinct query hashes it also
//! stores, divided by the query length (duplicates included). Candidates are
//! visited in ascending identity order and the best score wins; a later
//! candidate must beat it strictly, so ties go to the smaller identity.

use std::collections::HashSet;

use tracing::{debug, info, instrument};

use crate::config::MatchConfig;
use crate::store::FingerprintStore;
use crate::types::MatchResult;
use crate::Result;

/// Finds the catalog entry that best overlaps a query.
#[derive(Debug, Clone)]
pub struct Matcher {
    threshold: f64,
}

impl Matcher {
    /// Create a matcher accepting scores `>= threshold`.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Create a matcher from a match configuration.
    pub fn from_config(config: &MatchConfig) -> Self {
        Self::new(config.threshold)
    }

    /// Minimum accepted score.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Match `query` against every candidate the store proposes.
    #[instrument(skip_all, fields(query = query.len(), threshold = self.threshold))]
    pub async fn find_best_match<S>(&self, store: &S, query: &[String]) -> Result<MatchResult>
    where
        S: FingerprintStore + ?Sized,
    {
        let total_count = query.len();
        if query.is_empty() {
            debug!("Empty query, nothing to match");
            return Ok(MatchResult::no_match(0, self.threshold));
        }

        let query_set: HashSet<&str> = query.iter().map(String::as_str).collect();
        let candidates = store.lookup_candidates(query).await?;
        debug!(candidates = candidates.len(), "Fetched match candidates");

        let mut best = MatchResult::no_match(total_count, self.threshold);

        for identity in candidates {
            let Some(stored) = store.get_hashes(&identity).await? else {
                continue;
            };

            let matched_count = overlap(&query_set, &stored);
            let score = matched_count as f64 / total_count.max(1) as f64;
            debug!(%identity, overlap = matched_count, score, "Scored candidate");

            if score > best.score && score >= self.threshold {
                best = MatchResult {
                    identity: Some(identity),
                    score,
                    matched_count,
                    total_count,
                    threshold: self.threshold,
                };
            }
        }

        match &best.identity {
            Some(identity) => info!(%identity, score = best.score, "Match found"),
            None => info!("No match above threshold"),
        }
        Ok(best)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::from_config(&MatchConfig::default())
    }
}

/// Number of distinct values shared by the query set and `stored`.
fn overlap(query: &HashSet<&str>, stored: &[String]) -> usize {
    let stored: HashSet<&str> = stored.iter().map(String::as_str).collect();
    query.intersection(&stored).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn hashes(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn test_self_match_scores_one() {
        let store = MemoryStore::new();
        let song = hashes(&["a", "b", "c", "d"]);
        store.put("song", &song).await.unwrap();

        let result = Matcher::default().find_best_match(&store, &song).await.unwrap();
        assert_eq!(result.identity.as_deref(), Some("song"));
        assert_eq!(result.score, 1.0);
        assert_eq!(result.matched_count, 4);
        assert_eq!(result.total_count, 4);
    }

    #[tokio::test]
    async fn test_duplicates_do_not_inflate_overlap() {
        let store = MemoryStore::new();
        store.put("song", &hashes(&["a", "a", "a", "b"])).await.unwrap();

        let query = hashes(&["a", "a", "c", "d"]);
        let result = Matcher::new(0.0).find_best_match(&store, &query).await.unwrap();
        assert_eq!(result.matched_count, 1);
        assert_eq!(result.total_count, 4);
        assert_eq!(result.score, 0.25);
    }

    #[tokio::test]
    async fn test_best_candidate_wins() {
        let store = MemoryStore::new();
        store.put("weak", &hashes(&["a", "x", "y"])).await.unwrap();
        store.put("strong", &hashes(&["a", "b", "c"])).await.unwrap();

        let query = hashes(&["a", "b", "c", "d"]);
        let result = Matcher::default().find_best_match(&store, &query).await.unwrap();
        assert_eq!(result.identity.as_deref(), Some("strong"));
        assert_eq!(result.score, 0.75);
    }

    #[tokio::test]
    async fn test_tie_goes_to_smallest_identity() {
        let store = MemoryStore::new();
        store.put("zulu", &hashes(&["a", "b"])).await.unwrap();
        store.put("alpha", &hashes(&["a", "b"])).await.unwrap();
        store.put("mike", &hashes(&["a", "b"])).await.unwrap();

        let query = hashes(&["a", "b"]);
        let result = Matcher::default().find_best_match(&store, &query).await.unwrap();
        assert_eq!(result.identity.as_deref(), Some("alpha"));
    }

    #[tokio::test]
    async fn test_threshold_boundary_inclusive() {
        let store = MemoryStore::new();
        store.put("song", &hashes(&["a"])).await.unwrap();
        let query = hashes(&["a", "b", "c", "d"]);

        let at = Matcher::new(0.25).find_best_match(&store, &query).await.unwrap();
        assert!(at.is_match());

        let above = Matcher::new(0.26).find_best_match(&store, &query).await.unwrap();
        assert!(!above.is_match());
        assert_eq!(above.score, 0.0);
        assert_eq!(above.matched_count, 0);
        assert_eq!(above.total_count, 4);
        assert_eq!(above.threshold, 0.26);
    }

    #[tokio::test]
    async fn test_empty_query_never_matches() {
        let store = MemoryStore::new();
        store.put("song", &hashes(&["a"])).await.unwrap();

        for threshold in [0.0, 0.05, 1.0] {
            let result = Matcher::new(threshold).find_best_match(&store, &[]).await.unwrap();
            assert!(!result.is_match());
            assert_eq!(result.score, 0.0);
            assert_eq!(result.total_count, 0);
        }
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MemoryStore::new();
        store.close().await.unwrap();

        let err = Matcher::default()
            .find_best_match(&store, &hashes(&["a"]))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORE_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let store: Box<dyn FingerprintStore> = Box::new(MemoryStore::new());
        store.put("song", &hashes(&["a"])).await.unwrap();

        let result = Matcher::default()
            .find_best_match(store.as_ref(), &hashes(&["a"]))
            .await
            .unwrap();
        assert!(result.is_match());
    }
}
