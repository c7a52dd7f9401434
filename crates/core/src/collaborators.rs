//! Interfaces of the external services the matching engine consumes.

use async_trait::async_trait;

use crate::domain::book::{CatalogRecord, CoverImage, OwnedBook, TentativeBook};
use crate::domain::output::Recommendation;
use crate::errors::BookMatchError;

/// Produces tentative books and prose from natural-language input.
///
/// Implementations report unparseable model output as
/// [`BookMatchError::MalformedResponse`] and, once their own retry budget is
/// spent, as [`BookMatchError::InvalidResponse`].
#[async_trait]
pub trait RecommendationSource: Send + Sync {
    async fn recommend(
        &self,
        question: &str,
        owned_books: &[OwnedBook],
    ) -> Result<Recommendation, BookMatchError>;

    async fn recommend_from_owned(
        &self,
        owned_books: &[OwnedBook],
    ) -> Result<Vec<TentativeBook>, BookMatchError>;

    async fn request_replacement(
        &self,
        question: &str,
        previously_tried: &[TentativeBook],
    ) -> Result<TentativeBook, BookMatchError>;

    async fn describe(
        &self,
        question: &str,
        books: &[TentativeBook],
    ) -> Result<String, BookMatchError>;
}

/// Full-text catalog search. Blank query text yields an empty result, never an
/// error.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<CatalogRecord>, BookMatchError>;
}

/// Visual similarity between a user's cover photo and a catalog cover, as a
/// score in `[0, 100]`.
#[async_trait]
pub trait CoverSimilarity: Send + Sync {
    async fn similarity(
        &self,
        reference: &CoverImage,
        candidate_locator: &str,
    ) -> Result<f64, BookMatchError>;
}
