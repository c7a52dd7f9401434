//! LLM-backed recommendation source.
//!
//! The model only proposes tentative books and writes prose. Whether a book
//! exists is decided by the catalog search in `bookmatch-core`, never by the
//! model.

pub mod llm;
pub mod openai;
pub mod prompts;
pub mod recommender;

pub use llm::{ChatMessage, ChatRequest, ChatRole, LlmClient, LlmError};
pub use openai::OpenAiChatClient;
pub use recommender::{LlmRecommender, RecommenderSettings};
