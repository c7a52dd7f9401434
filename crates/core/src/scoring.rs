//! Candidate scoring: weighs title and author similarity into one total and
//! applies independent per-field acceptance thresholds.

use std::sync::Arc;

use tracing::debug;

use crate::domain::book::{CatalogRecord, TentativeBook};
use crate::similarity::{Levenshtein, LevenshteinWithoutParentheses, SimilarityStrategy};

pub const TITLE_WEIGHT: f64 = 0.8;
pub const AUTHOR_WEIGHT: f64 = 0.2;

/// Inclusive lower bounds each field score must reach for a match.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchThresholds {
    /// Loose: titles are often truncated or translated (default: 0.4)
    pub title: f64,
    /// Strict: a different author usually means a different book (default: 0.8)
    pub author: f64,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self { title: 0.4, author: 0.8 }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub record: CatalogRecord,
    pub title_score: f64,
    pub author_score: f64,
    pub total_score: f64,
}

/// Result of scoring one search result set against a tentative book.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Best-ranked candidate, present whenever the result set was non-empty.
    pub best: Option<ScoredCandidate>,
}

impl MatchOutcome {
    pub fn empty() -> Self {
        Self { matched: false, best: None }
    }

    pub fn record(&self) -> Option<&CatalogRecord> {
        self.best.as_ref().map(|candidate| &candidate.record)
    }

    pub fn total_score(&self) -> f64 {
        self.best.as_ref().map(|candidate| candidate.total_score).unwrap_or(0.0)
    }
}

pub fn weighted_total(title_score: f64, author_score: f64) -> f64 {
    title_score * TITLE_WEIGHT + author_score * AUTHOR_WEIGHT
}

#[derive(Clone)]
pub struct CandidateScorer {
    title_strategy: Arc<dyn SimilarityStrategy>,
    author_strategy: Arc<dyn SimilarityStrategy>,
    thresholds: MatchThresholds,
}

impl Default for CandidateScorer {
    fn default() -> Self {
        Self::new(MatchThresholds::default())
    }
}

impl CandidateScorer {
    /// Titles ignore parenthesized annotations, authors use plain Levenshtein.
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self::with_strategies(
            Arc::new(LevenshteinWithoutParentheses),
            Arc::new(Levenshtein),
            thresholds,
        )
    }

    pub fn with_strategies(
        title_strategy: Arc<dyn SimilarityStrategy>,
        author_strategy: Arc<dyn SimilarityStrategy>,
        thresholds: MatchThresholds,
    ) -> Self {
        Self { title_strategy, author_strategy, thresholds }
    }

    pub fn thresholds(&self) -> MatchThresholds {
        self.thresholds
    }

    pub fn score(&self, book: &TentativeBook, record: &CatalogRecord) -> ScoredCandidate {
        let title_score = self.title_strategy.score(&record.title, &book.title);
        let author_score = self.author_strategy.score(&record.author, &book.author);

        ScoredCandidate {
            record: record.clone(),
            title_score,
            author_score,
            total_score: weighted_total(title_score, author_score),
        }
    }

    pub fn accepts(&self, candidate: &ScoredCandidate) -> bool {
        candidate.title_score >= self.thresholds.title
            && candidate.author_score >= self.thresholds.author
    }

    /// Scores every record and orders them by total score, highest first.
    /// The sort is stable, so equal totals keep catalog order.
    pub fn rank(&self, book: &TentativeBook, records: &[CatalogRecord]) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> =
            records.iter().map(|record| self.score(book, record)).collect();
        scored.sort_by(|left, right| right.total_score.total_cmp(&left.total_score));
        scored
    }

    pub fn evaluate(&self, book: &TentativeBook, records: &[CatalogRecord]) -> MatchOutcome {
        let Some(best) = self.rank(book, records).into_iter().next() else {
            return MatchOutcome::empty();
        };

        debug!(
            event_name = "scoring.best_candidate",
            title = %book.title,
            candidate_id = %best.record.id,
            title_score = best.title_score,
            author_score = best.author_score,
            total_score = best.total_score,
            "ranked catalog candidates"
        );

        MatchOutcome { matched: self.accepts(&best), best: Some(best) }
    }
}
