use serde::Serialize;

use crate::domain::book::{CatalogRecord, OwnedBook, TentativeBook};
use crate::errors::BookMatchError;

/// What the recommendation source returns for a question.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Recommendation {
    /// Entries from the caller's own list, echoed back by identity.
    pub owned_matches: Vec<OwnedBook>,
    pub new_books: Vec<TentativeBook>,
}

/// Result of one question-driven recommendation call. Always produced, even when
/// the call degraded; `failure` then carries the reason and `description` its
/// user-facing message.
#[derive(Clone, Debug, Serialize)]
pub struct RecommendationOutput {
    pub owned_ids: Vec<String>,
    pub new_records: Vec<CatalogRecord>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_failure")]
    pub failure: Option<BookMatchError>,
}

impl RecommendationOutput {
    pub fn failed(error: BookMatchError) -> Self {
        Self {
            owned_ids: Vec::new(),
            new_records: Vec::new(),
            description: error.user_message().to_owned(),
            failure: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}

fn serialize_failure<S>(failure: &Option<BookMatchError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match failure {
        Some(error) => serializer.serialize_str(&error.to_string()),
        None => serializer.serialize_none(),
    }
}
