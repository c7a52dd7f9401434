//! Drives resolution across a whole recommendation and assembles the output
//! bundle. Nothing here returns an error to the caller: failures become a
//! degraded [`RecommendationOutput`] or an empty record list.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::collaborators::{CatalogSearch, RecommendationSource};
use crate::domain::book::{CatalogRecord, OwnedBook, TentativeBook};
use crate::domain::output::RecommendationOutput;
use crate::errors::BookMatchError;
use crate::pacing::{pacer_for, PacingMode, SearchPacer, DEFAULT_PACING_DELAY};
use crate::planner::{QueryPlanner, DEFAULT_SEARCH_LIMIT};
use crate::resolution::{Resolver, ResolverSettings};
use crate::scoring::{CandidateScorer, MatchThresholds};

pub const MIN_QUESTION_CHARS: usize = 4;

/// Tunables for assembling a [`BookMatcher`] from its collaborators.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    pub thresholds: MatchThresholds,
    pub resolver: ResolverSettings,
    pub search_limit: usize,
    pub pacing_mode: PacingMode,
    pub pacing_delay: Duration,
    pub min_question_chars: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            thresholds: MatchThresholds::default(),
            resolver: ResolverSettings::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            pacing_mode: PacingMode::Global,
            pacing_delay: DEFAULT_PACING_DELAY,
            min_question_chars: MIN_QUESTION_CHARS,
        }
    }
}

#[derive(Clone)]
pub struct BookMatcher {
    recommender: Arc<dyn RecommendationSource>,
    resolver: Resolver,
    min_question_chars: usize,
}

impl BookMatcher {
    pub fn new(
        recommender: Arc<dyn RecommendationSource>,
        resolver: Resolver,
        min_question_chars: usize,
    ) -> Self {
        Self { recommender, resolver, min_question_chars }
    }

    pub fn assemble(
        recommender: Arc<dyn RecommendationSource>,
        catalog: Arc<dyn CatalogSearch>,
        settings: &EngineSettings,
    ) -> Self {
        let pacer = pacer_for(settings.pacing_mode, settings.pacing_delay);
        Self::assemble_with_pacer(recommender, catalog, pacer, settings)
    }

    pub fn assemble_with_pacer(
        recommender: Arc<dyn RecommendationSource>,
        catalog: Arc<dyn CatalogSearch>,
        pacer: Arc<dyn SearchPacer>,
        settings: &EngineSettings,
    ) -> Self {
        let planner = QueryPlanner::new(catalog, pacer, settings.search_limit);
        let resolver = Resolver::new(
            recommender.clone(),
            planner,
            CandidateScorer::new(settings.thresholds),
            settings.resolver,
        );
        Self::new(recommender, resolver, settings.min_question_chars)
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Recommends books for `question`, confirming every new suggestion against
    /// the catalog. Never fails: on error the output is empty and its
    /// description explains what went wrong.
    pub async fn resolve_recommendation(
        &self,
        question: &str,
        owned_books: &[OwnedBook],
    ) -> RecommendationOutput {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!("recommendation", correlation_id = %correlation_id);

        async {
            match self.try_resolve_recommendation(question, owned_books).await {
                Ok(output) => output,
                Err(error) => {
                    warn!(
                        event_name = "recommendation.failed",
                        error = %error,
                        "recommendation degraded to empty result"
                    );
                    RecommendationOutput::failed(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    pub async fn try_resolve_recommendation(
        &self,
        question: &str,
        owned_books: &[OwnedBook],
    ) -> Result<RecommendationOutput, BookMatchError> {
        validate_question(question, self.min_question_chars)?;

        let recommendation = self.recommender.recommend(question, owned_books).await?;
        info!(
            event_name = "recommendation.received",
            owned_matches = recommendation.owned_matches.len(),
            new_books = recommendation.new_books.len(),
            "recommendation source answered"
        );

        let new_records =
            self.resolve_all(question, &recommendation.new_books, &recommendation.new_books).await;

        let mut owned_ids = Vec::new();
        for owned in &recommendation.owned_matches {
            if !owned_ids.contains(&owned.id) {
                owned_ids.push(owned.id.clone());
            }
        }

        let described: Vec<TentativeBook> = recommendation
            .owned_matches
            .iter()
            .map(OwnedBook::as_tentative)
            .chain(new_records.iter().map(CatalogRecord::as_tentative))
            .collect();
        let description = self.recommender.describe(question, &described).await?;

        info!(
            event_name = "recommendation.completed",
            owned_ids = owned_ids.len(),
            new_records = new_records.len(),
            "recommendation resolved"
        );
        Ok(RecommendationOutput { owned_ids, new_records, description, failure: None })
    }

    /// Recommends new books from the caller's shelf alone. Books already owned
    /// are never returned; any failure yields an empty list.
    pub async fn resolve_owned_books_only(&self, owned_books: &[OwnedBook]) -> Vec<CatalogRecord> {
        let correlation_id = Uuid::new_v4().to_string();
        let span = info_span!("owned_recommendation", correlation_id = %correlation_id);

        async {
            if owned_books.is_empty() {
                return Vec::new();
            }

            let suggestions = match self.recommender.recommend_from_owned(owned_books).await {
                Ok(suggestions) => suggestions,
                Err(error) => {
                    warn!(
                        event_name = "owned_recommendation.failed",
                        error = %error,
                        "owned-book recommendation degraded to empty result"
                    );
                    return Vec::new();
                }
            };

            let question = owned_books_question(owned_books);
            let mut seed: Vec<TentativeBook> =
                owned_books.iter().map(OwnedBook::as_tentative).collect();
            seed.extend(suggestions.iter().cloned());

            let owned_ids: HashSet<&str> = owned_books.iter().map(|book| book.id.as_str()).collect();
            let records = self.resolve_all(&question, &suggestions, &seed).await;
            records.into_iter().filter(|record| !owned_ids.contains(record.id.as_str())).collect()
        }
        .instrument(span)
        .await
    }

    /// Runs one resolution loop per book concurrently and deduplicates the
    /// confirmed records by catalog id.
    async fn resolve_all(
        &self,
        question: &str,
        books: &[TentativeBook],
        already_suggested: &[TentativeBook],
    ) -> Vec<CatalogRecord> {
        let resolutions = join_all(
            books.iter().map(|book| self.resolver.resolve(question, book.clone(), already_suggested)),
        )
        .await;

        dedup_by_id(resolutions.into_iter().filter_map(|resolution| {
            let title = resolution.original.title.clone();
            match resolution.into_result() {
                Ok(record) => Some(record),
                Err(error) => {
                    info!(
                        event_name = "recommendation.book_unmatched",
                        title = %title,
                        error = %error,
                        "dropping tentative book without catalog candidate"
                    );
                    None
                }
            }
        }))
    }
}

/// Counts characters after trimming surrounding whitespace.
pub fn validate_question(question: &str, min_chars: usize) -> Result<(), BookMatchError> {
    if question.trim().chars().count() < min_chars {
        return Err(BookMatchError::QuestionTooShort { min_chars });
    }
    Ok(())
}

fn owned_books_question(owned_books: &[OwnedBook]) -> String {
    let titles: Vec<&str> = owned_books.iter().map(|book| book.title.as_str()).collect();
    format!("Books a reader of these titles would enjoy next: {}", titles.join(", "))
}

fn dedup_by_id(records: impl IntoIterator<Item = CatalogRecord>) -> Vec<CatalogRecord> {
    let mut seen = HashSet::new();
    records.into_iter().filter(|record| seen.insert(record.id.clone())).collect()
}
