use serde::{Deserialize, Serialize};

use crate::domain::book::{CatalogRecord, TentativeBook};
use crate::errors::BookMatchError;
use crate::scoring::ScoredCandidate;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionState {
    Searching,
    Scoring,
    Accepted,
    Retrying,
    Exhausted,
}

impl ResolutionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Exhausted)
    }
}

/// Final disposition of one tentative book after the retry loop.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub original: TentativeBook,
    /// `Accepted` or `Exhausted`.
    pub final_state: ResolutionState,
    /// The accepted candidate, or on exhaustion the best-scored fallback.
    pub candidate: Option<ScoredCandidate>,
    /// Searches issued, at most the configured retry budget.
    pub attempts: u32,
    /// Replacement books obtained from the recommendation source.
    pub replacements: u32,
    /// Every book that was searched or suggested before the loop ended.
    pub tried: Vec<TentativeBook>,
}

impl Resolution {
    pub fn record(&self) -> Option<&CatalogRecord> {
        self.candidate.as_ref().map(|candidate| &candidate.record)
    }

    pub fn into_record(self) -> Option<CatalogRecord> {
        self.candidate.map(|candidate| candidate.record)
    }

    /// The resolved record, or [`BookMatchError::NoMatchFound`] when no attempt
    /// ever produced a candidate.
    pub fn into_result(self) -> Result<CatalogRecord, BookMatchError> {
        self.into_record().ok_or(BookMatchError::NoMatchFound)
    }

    pub fn accepted(&self) -> bool {
        self.final_state == ResolutionState::Accepted
    }
}
