use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BookMatchError {
    #[error("question must be at least {min_chars} characters")]
    QuestionTooShort { min_chars: usize },
    #[error("upstream unavailable: {0}")]
    Upstream(String),
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),
    #[error("invalid upstream response after {attempts} attempts: {last_error}")]
    InvalidResponse { attempts: u32, last_error: String },
    #[error("no catalog match found")]
    NoMatchFound,
    #[error("upstream rate limit exceeded")]
    RateLimited,
    #[error("image similarity failed: {0}")]
    ImageSimilarity(String),
}

impl BookMatchError {
    /// Whether another attempt against the same collaborator may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_) | Self::MalformedResponse(_) | Self::RateLimited)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::QuestionTooShort { .. } => "Please ask a longer question.",
            Self::Upstream(_) => {
                "The network connection is unstable. Please try again in a moment."
            }
            Self::MalformedResponse(_) | Self::InvalidResponse { .. } => {
                "A temporary error occurred. Please try again in a moment."
            }
            Self::NoMatchFound => "No books matching your request could be found.",
            Self::RateLimited => {
                "The service is receiving too many requests. Please try again in a moment."
            }
            Self::ImageSimilarity(_) => {
                "Comparing the cover photo failed. Please try again in a moment."
            }
        }
    }
}
