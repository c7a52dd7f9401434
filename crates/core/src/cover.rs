//! Matches a physical book from its cover photo: OCR fragments narrow the
//! catalog search, then cover similarity picks the winner.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::collaborators::CoverSimilarity;
use crate::domain::book::{CatalogRecord, CoverImage};
use crate::planner::QueryPlanner;

#[derive(Clone)]
pub struct CoverMatcher {
    planner: QueryPlanner,
    similarity: Arc<dyn CoverSimilarity>,
}

impl CoverMatcher {
    pub fn new(planner: QueryPlanner, similarity: Arc<dyn CoverSimilarity>) -> Self {
        Self { planner, similarity }
    }

    /// Highest cover similarity wins; the first candidate wins ties. Candidates
    /// whose similarity cannot be computed are skipped.
    pub async fn match_cover(
        &self,
        fragments: &[String],
        cover: &CoverImage,
    ) -> Option<CatalogRecord> {
        let candidates = match self.planner.narrow_by_fragments(fragments).await {
            Ok(candidates) => candidates,
            Err(error) => {
                warn!(
                    event_name = "cover.search_failed",
                    error = %error,
                    "fragment search failed"
                );
                return None;
            }
        };

        let mut best: Option<(CatalogRecord, f64)> = None;
        for candidate in candidates {
            let score = match self.similarity.similarity(cover, &candidate.image).await {
                Ok(score) => score,
                Err(error) => {
                    warn!(
                        event_name = "cover.similarity_failed",
                        record_id = %candidate.id,
                        error = %error,
                        "skipping candidate"
                    );
                    continue;
                }
            };
            debug!(event_name = "cover.candidate_scored", record_id = %candidate.id, score);

            let improves = best.as_ref().map_or(true, |(_, best_score)| score > *best_score);
            if improves {
                best = Some((candidate, score));
            }
        }

        if let Some((record, score)) = &best {
            info!(event_name = "cover.matched", record_id = %record.id, score, "cover matched");
        }
        best.map(|(record, _)| record)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::CoverMatcher;
    use crate::collaborators::{CatalogSearch, CoverSimilarity};
    use crate::domain::book::{record, CatalogRecord, CoverImage};
    use crate::errors::BookMatchError;
    use crate::pacing::PerCallPacer;
    use crate::planner::QueryPlanner;

    struct FixedCatalog(Result<Vec<CatalogRecord>, BookMatchError>);

    #[async_trait]
    impl CatalogSearch for FixedCatalog {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<CatalogRecord>, BookMatchError> {
            self.0.clone()
        }
    }

    struct CoverScores(HashMap<String, Result<f64, BookMatchError>>);

    #[async_trait]
    impl CoverSimilarity for CoverScores {
        async fn similarity(
            &self,
            _reference: &CoverImage,
            candidate_locator: &str,
        ) -> Result<f64, BookMatchError> {
            self.0.get(candidate_locator).cloned().unwrap_or(Ok(0.0))
        }
    }

    fn matcher(
        catalog: Result<Vec<CatalogRecord>, BookMatchError>,
        scores: Vec<(&str, Result<f64, BookMatchError>)>,
    ) -> CoverMatcher {
        let planner = QueryPlanner::new(
            Arc::new(FixedCatalog(catalog)),
            Arc::new(PerCallPacer::new(Duration::ZERO)),
            10,
        );
        let scores = scores
            .into_iter()
            .map(|(id, score)| (format!("https://covers.example/{id}.jpg"), score))
            .collect();
        CoverMatcher::new(planner, Arc::new(CoverScores(scores)))
    }

    fn fragments() -> Vec<String> {
        vec!["데미안".to_owned()]
    }

    #[tokio::test]
    async fn picks_highest_cover_similarity() {
        let matcher = matcher(
            Ok(vec![record("a", "데미안", "헤세"), record("b", "데미안", "헤세")]),
            vec![("a", Ok(41.0)), ("b", Ok(87.5))],
        );

        let matched = matcher.match_cover(&fragments(), &CoverImage(vec![1, 2, 3])).await;

        assert_eq!(matched.map(|record| record.id), Some("b".to_owned()));
    }

    #[tokio::test]
    async fn skips_candidates_whose_similarity_failed() {
        let matcher = matcher(
            Ok(vec![record("a", "데미안", "헤세"), record("b", "데미안", "헤세")]),
            vec![
                ("a", Ok(12.0)),
                ("b", Err(BookMatchError::ImageSimilarity("download failed".to_owned()))),
            ],
        );

        let matched = matcher.match_cover(&fragments(), &CoverImage(Vec::new())).await;

        assert_eq!(matched.map(|record| record.id), Some("a".to_owned()));
    }

    #[tokio::test]
    async fn first_candidate_wins_ties() {
        let matcher = matcher(
            Ok(vec![record("a", "x", "y"), record("b", "x", "y")]),
            vec![("a", Ok(50.0)), ("b", Ok(50.0))],
        );

        let matched = matcher.match_cover(&fragments(), &CoverImage(Vec::new())).await;

        assert_eq!(matched.map(|record| record.id), Some("a".to_owned()));
    }

    #[tokio::test]
    async fn no_candidates_or_search_failure_yield_none() {
        let empty = matcher(Ok(Vec::new()), Vec::new());
        assert!(empty.match_cover(&fragments(), &CoverImage(Vec::new())).await.is_none());

        let failing = matcher(Err(BookMatchError::RateLimited), Vec::new());
        assert!(failing.match_cover(&fragments(), &CoverImage(Vec::new())).await.is_none());
    }
}
