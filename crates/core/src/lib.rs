pub mod collaborators;
pub mod config;
pub mod cover;
pub mod domain;
pub mod errors;
pub mod orchestrator;
pub mod pacing;
pub mod planner;
pub mod resolution;
pub mod scoring;
pub mod similarity;

pub use collaborators::{CatalogSearch, CoverSimilarity, RecommendationSource};
pub use cover::CoverMatcher;
pub use domain::book::{CatalogRecord, CoverImage, OwnedBook, TentativeBook};
pub use domain::output::{Recommendation, RecommendationOutput};
pub use errors::BookMatchError;
pub use orchestrator::{BookMatcher, EngineSettings};
pub use pacing::{PacingMode, PacingPermit, PerCallPacer, SearchPacer, SerialPacer};
pub use planner::QueryPlanner;
pub use resolution::{Resolution, ResolutionState, Resolver, ResolverSettings};
pub use scoring::{CandidateScorer, MatchOutcome, MatchThresholds, ScoredCandidate};
pub use similarity::{Levenshtein, LevenshteinWithoutParentheses, SimilarityStrategy};
