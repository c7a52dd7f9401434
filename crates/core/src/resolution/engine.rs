use std::sync::Arc;

use tracing::{debug, info, trace, warn};

use crate::collaborators::RecommendationSource;
use crate::domain::book::{CatalogRecord, TentativeBook};
use crate::planner::QueryPlanner;
use crate::resolution::states::{Resolution, ResolutionState};
use crate::scoring::{CandidateScorer, ScoredCandidate};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Search attempts allowed per tentative book (default: 3)
    pub max_retries: u32,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES }
    }
}

enum Step {
    Searching(TentativeBook),
    Scoring(TentativeBook, Vec<CatalogRecord>),
    Retrying(TentativeBook),
    Exhausted,
}

impl Step {
    fn state(&self) -> ResolutionState {
        match self {
            Self::Searching(_) => ResolutionState::Searching,
            Self::Scoring(..) => ResolutionState::Scoring,
            Self::Retrying(_) => ResolutionState::Retrying,
            Self::Exhausted => ResolutionState::Exhausted,
        }
    }
}

/// Search, score, and on rejection ask for a replacement book until a candidate
/// is accepted or the retry budget runs out.
#[derive(Clone)]
pub struct Resolver {
    recommender: Arc<dyn RecommendationSource>,
    planner: QueryPlanner,
    scorer: CandidateScorer,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        recommender: Arc<dyn RecommendationSource>,
        planner: QueryPlanner,
        scorer: CandidateScorer,
        settings: ResolverSettings,
    ) -> Self {
        Self { recommender, planner, scorer, settings }
    }

    pub fn planner(&self) -> &QueryPlanner {
        &self.planner
    }

    pub fn scorer(&self) -> &CandidateScorer {
        &self.scorer
    }

    /// Resolves one tentative book. `already_suggested` seeds the previously
    /// tried list so replacements avoid books the caller has already seen.
    ///
    /// Search failures count as an attempt with no results. A replacement that
    /// cannot be obtained ends the loop early; either way the result falls back
    /// to the highest-scoring candidate seen, with later attempts winning ties.
    pub async fn resolve(
        &self,
        question: &str,
        book: TentativeBook,
        already_suggested: &[TentativeBook],
    ) -> Resolution {
        let budget = self.settings.max_retries.max(1);
        let mut tried = already_suggested.to_vec();
        let mut fallback: Option<ScoredCandidate> = None;
        let mut attempts = 0;
        let mut replacements = 0;
        let mut step = Step::Searching(book.clone());

        loop {
            trace!(event_name = "resolution.state", state = ?step.state(), attempt = attempts);
            step = match step {
                Step::Searching(current) => {
                    attempts += 1;
                    let results = match self.planner.search_for(&current).await {
                        Ok(results) => results,
                        Err(error) => {
                            warn!(
                                event_name = "resolution.attempt.search_failed",
                                attempt = attempts,
                                title = %current.title,
                                error = %error,
                                "catalog search failed; counting attempt as empty"
                            );
                            Vec::new()
                        }
                    };
                    Step::Scoring(current, results)
                }
                Step::Scoring(current, results) => {
                    let outcome = self.scorer.evaluate(&current, &results);
                    match outcome.best {
                        Some(best) if outcome.matched => {
                            info!(
                                event_name = "resolution.attempt.accepted",
                                attempt = attempts,
                                title = %current.title,
                                record_id = %best.record.id,
                                total_score = best.total_score,
                                "catalog candidate accepted"
                            );
                            push_unique(&mut tried, current);
                            return Resolution {
                                original: book,
                                final_state: ResolutionState::Accepted,
                                candidate: Some(best),
                                attempts,
                                replacements,
                                tried,
                            };
                        }
                        Some(best) => {
                            debug!(
                                event_name = "resolution.attempt.rejected",
                                attempt = attempts,
                                title = %current.title,
                                record_id = %best.record.id,
                                total_score = best.total_score,
                                "best candidate below thresholds"
                            );
                            fallback = Some(keep_better(fallback, best));
                        }
                        None => {
                            debug!(
                                event_name = "resolution.attempt.empty",
                                attempt = attempts,
                                title = %current.title,
                                "no catalog results"
                            );
                        }
                    }

                    if attempts >= budget {
                        push_unique(&mut tried, current);
                        Step::Exhausted
                    } else {
                        Step::Retrying(current)
                    }
                }
                Step::Retrying(current) => {
                    push_unique(&mut tried, current);
                    match self.recommender.request_replacement(question, &tried).await {
                        Ok(next) => {
                            replacements += 1;
                            debug!(
                                event_name = "resolution.replacement_received",
                                replacement = replacements,
                                title = %next.title,
                                author = %next.author,
                                "retrying with replacement book"
                            );
                            Step::Searching(next)
                        }
                        Err(error) => {
                            warn!(
                                event_name = "resolution.replacement_failed",
                                attempt = attempts,
                                error = %error,
                                "could not obtain replacement book; using fallback"
                            );
                            Step::Exhausted
                        }
                    }
                }
                Step::Exhausted => {
                    info!(
                        event_name = "resolution.exhausted",
                        title = %book.title,
                        attempts,
                        fallback_id = fallback.as_ref().map(|c| c.record.id.as_str()).unwrap_or("none"),
                        "retry budget exhausted"
                    );
                    return Resolution {
                        original: book,
                        final_state: ResolutionState::Exhausted,
                        candidate: fallback,
                        attempts,
                        replacements,
                        tried,
                    };
                }
            };
        }
    }
}

fn keep_better(current: Option<ScoredCandidate>, challenger: ScoredCandidate) -> ScoredCandidate {
    match current {
        Some(current) if current.total_score > challenger.total_score => current,
        _ => challenger,
    }
}

fn push_unique(tried: &mut Vec<TentativeBook>, book: TentativeBook) {
    if !tried.contains(&book) {
        tried.push(book);
    }
}
