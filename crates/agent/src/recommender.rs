//! [`RecommendationSource`] backed by a chat-completion model.
//!
//! Model output is decoded strictly: anything that is not the expected JSON
//! object (an optional code fence aside) counts as a malformed response and is
//! retried, up to the configured budget, before the call gives up with
//! [`BookMatchError::InvalidResponse`].

use std::sync::Arc;

use async_trait::async_trait;
use bookmatch_core::collaborators::RecommendationSource;
use bookmatch_core::config::LlmConfig;
use bookmatch_core::domain::book::{OwnedBook, TentativeBook};
use bookmatch_core::domain::output::Recommendation;
use bookmatch_core::errors::BookMatchError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::llm::{ChatMessage, ChatRequest, LlmClient};
use crate::prompts;

pub const RECOMMENDATION_TEMPERATURE: f32 = 0.01;
pub const DESCRIPTION_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const REPLACEMENT_MAX_TOKENS: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecommenderSettings {
    pub model: String,
    pub description_model: String,
    /// Attempts per call before giving up (default: 3)
    pub max_retries: u32,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_owned(),
            description_model: "gpt-4o-mini".to_owned(),
            max_retries: 3,
        }
    }
}

impl From<&LlmConfig> for RecommenderSettings {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            description_model: config.description_model.clone(),
            max_retries: config.max_retries,
        }
    }
}

pub struct LlmRecommender {
    client: Arc<dyn LlmClient>,
    settings: RecommenderSettings,
}

impl LlmRecommender {
    pub fn new(client: Arc<dyn LlmClient>, settings: RecommenderSettings) -> Self {
        Self { client, settings }
    }

    fn request(&self, system: &str, user: String, max_tokens: u32) -> ChatRequest {
        ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: RECOMMENDATION_TEMPERATURE,
            max_tokens,
        }
    }

    /// Retries every retryable failure up to the budget. Output that never
    /// decodes ends as [`BookMatchError::InvalidResponse`]; when the last attempt
    /// failed upstream or was rate limited, that error is returned unchanged.
    async fn complete_with_retries<T: Send>(
        &self,
        operation: &'static str,
        request: &ChatRequest,
        decode: impl Fn(&str) -> Result<T, BookMatchError> + Send + Sync,
    ) -> Result<T, BookMatchError> {
        let budget = self.settings.max_retries.max(1);
        let mut last_error = None;

        for attempt in 1..=budget {
            let outcome = match self.client.complete(request).await {
                Ok(content) => decode(&content),
                Err(error) => Err(BookMatchError::from(error)),
            };

            match outcome {
                Ok(value) => return Ok(value),
                Err(error) if error.is_retryable() => {
                    warn!(
                        event_name = "llm.attempt.failed",
                        operation,
                        attempt,
                        budget,
                        error = %error,
                        "retrying recommendation call"
                    );
                    last_error = Some(error);
                }
                Err(error) => return Err(error),
            }
        }

        warn!(event_name = "llm.retries_exhausted", operation, attempts = budget, "giving up");
        Err(exhausted(budget, last_error))
    }
}

fn exhausted(attempts: u32, last_error: Option<BookMatchError>) -> BookMatchError {
    match last_error {
        Some(error @ (BookMatchError::Upstream(_) | BookMatchError::RateLimited)) => error,
        Some(error) => BookMatchError::InvalidResponse { attempts, last_error: error.to_string() },
        None => BookMatchError::InvalidResponse { attempts, last_error: String::new() },
    }
}

#[async_trait]
impl RecommendationSource for LlmRecommender {
    async fn recommend(
        &self,
        question: &str,
        owned_books: &[OwnedBook],
    ) -> Result<Recommendation, BookMatchError> {
        let request = self.request(
            prompts::RECOMMENDATION,
            prompts::recommendation_input(question, owned_books),
            DEFAULT_MAX_TOKENS,
        );
        let recommendation = self
            .complete_with_retries("recommend", &request, |content| {
                decode_recommendation(content, owned_books)
            })
            .await?;

        info!(
            event_name = "llm.recommendation.decoded",
            owned_matches = recommendation.owned_matches.len(),
            new_books = recommendation.new_books.len(),
            "recommendation decoded"
        );
        Ok(recommendation)
    }

    async fn recommend_from_owned(
        &self,
        owned_books: &[OwnedBook],
    ) -> Result<Vec<TentativeBook>, BookMatchError> {
        let request = self.request(
            prompts::OWNED_RECOMMENDATION,
            prompts::owned_recommendation_input(owned_books),
            DEFAULT_MAX_TOKENS,
        );
        self.complete_with_retries("recommend_from_owned", &request, decode_book_list).await
    }

    async fn request_replacement(
        &self,
        question: &str,
        previously_tried: &[TentativeBook],
    ) -> Result<TentativeBook, BookMatchError> {
        let request = self.request(
            prompts::REPLACEMENT,
            prompts::replacement_input(question, previously_tried),
            REPLACEMENT_MAX_TOKENS,
        );
        self.complete_with_retries("request_replacement", &request, decode_single_book).await
    }

    async fn describe(
        &self,
        question: &str,
        books: &[TentativeBook],
    ) -> Result<String, BookMatchError> {
        let request = ChatRequest {
            model: self.settings.description_model.clone(),
            messages: vec![
                ChatMessage::system(prompts::DESCRIPTION),
                ChatMessage::user(prompts::description_input(question, books)),
            ],
            temperature: DESCRIPTION_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };
        self.complete_with_retries("describe", &request, decode_description).await
    }
}

#[derive(Deserialize)]
struct BookPayload {
    title: String,
    author: String,
}

impl BookPayload {
    fn into_book(self) -> Result<TentativeBook, BookMatchError> {
        let title = self.title.trim();
        let author = self.author.trim();
        if title.is_empty() || author.is_empty() {
            return Err(BookMatchError::MalformedResponse(
                "book entry with blank title or author".to_owned(),
            ));
        }
        Ok(TentativeBook::new(title, author))
    }
}

#[derive(Deserialize)]
struct RecommendationPayload {
    owned_books: Vec<BookPayload>,
    new_books: Vec<BookPayload>,
}

#[derive(Deserialize)]
struct BookListPayload {
    books: Vec<BookPayload>,
}

/// Drops a surrounding Markdown code fence, if any.
pub fn strip_code_fence(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

fn decode_json<T: DeserializeOwned>(content: &str) -> Result<T, BookMatchError> {
    serde_json::from_str(strip_code_fence(content))
        .map_err(|error| BookMatchError::MalformedResponse(error.to_string()))
}

fn decode_books(payloads: Vec<BookPayload>) -> Result<Vec<TentativeBook>, BookMatchError> {
    payloads.into_iter().map(BookPayload::into_book).collect()
}

/// Owned entries are kept only when they name one of the caller's books
/// (trimmed title and author equal); the caller's record is returned so its id
/// survives.
pub fn decode_recommendation(
    content: &str,
    owned_books: &[OwnedBook],
) -> Result<Recommendation, BookMatchError> {
    let payload: RecommendationPayload = decode_json(content)?;

    let mut owned_matches: Vec<OwnedBook> = Vec::new();
    for echoed in decode_books(payload.owned_books)? {
        let known = owned_books.iter().find(|owned| {
            owned.title.trim() == echoed.title && owned.author.trim() == echoed.author
        });
        match known {
            Some(owned) if !owned_matches.contains(owned) => owned_matches.push(owned.clone()),
            Some(_) => {}
            None => warn!(
                event_name = "llm.owned_match.unknown",
                title = %echoed.title,
                "dropping owned entry that is not on the caller's list"
            ),
        }
    }

    Ok(Recommendation { owned_matches, new_books: decode_books(payload.new_books)? })
}

pub fn decode_book_list(content: &str) -> Result<Vec<TentativeBook>, BookMatchError> {
    let payload: BookListPayload = decode_json(content)?;
    decode_books(payload.books)
}

pub fn decode_single_book(content: &str) -> Result<TentativeBook, BookMatchError> {
    decode_json::<BookPayload>(content)?.into_book()
}

pub fn decode_description(content: &str) -> Result<String, BookMatchError> {
    let text = content.trim();
    if text.is_empty() {
        return Err(BookMatchError::MalformedResponse("empty description".to_owned()));
    }
    Ok(text.to_owned())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;

    use async_trait::async_trait;
    use bookmatch_core::collaborators::RecommendationSource;
    use bookmatch_core::domain::book::{OwnedBook, TentativeBook};
    use bookmatch_core::errors::BookMatchError;
    use tokio::sync::Mutex;

    use super::{
        decode_book_list, decode_recommendation, decode_single_book, strip_code_fence,
        LlmRecommender, RecommenderSettings, DESCRIPTION_TEMPERATURE, REPLACEMENT_MAX_TOKENS,
    };
    use crate::llm::{ChatRequest, LlmClient, LlmError};

    struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
            self.requests.lock().await.push(request.clone());
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_owned())))
        }
    }

    fn recommender(llm: Arc<ScriptedLlm>) -> LlmRecommender {
        LlmRecommender::new(llm, RecommenderSettings::default())
    }

    #[test]
    fn code_fences_are_tolerated() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");

        let book = decode_single_book("```\n{\"title\":\"데미안\",\"author\":\"헤르만 헤세\"}\n```");
        assert_eq!(book, Ok(TentativeBook::new("데미안", "헤르만 헤세")));
    }

    #[test]
    fn owned_entries_are_matched_by_trimmed_title_and_author() {
        let owned = vec![
            OwnedBook::new("123", "Python 기초 ", "김철수"),
            OwnedBook::new("124", "자료구조", "박영희"),
        ];
        let content = r#"{
            "owned_books": [
                {"title": "Python 기초", "author": " 김철수"},
                {"title": "없는 책", "author": "누군가"}
            ],
            "new_books": [{"title": "Python 입문", "author": "이영희"}]
        }"#;

        let recommendation = decode_recommendation(content, &owned).expect("decodes");

        assert_eq!(recommendation.owned_matches, vec![owned[0].clone()]);
        assert_eq!(recommendation.new_books, vec![TentativeBook::new("Python 입문", "이영희")]);
    }

    #[test]
    fn strict_decoding_rejects_loose_shapes() {
        assert!(matches!(
            decode_single_book("데미안-헤르만 헤세"),
            Err(BookMatchError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_single_book(r#"{"title": "데미안"}"#),
            Err(BookMatchError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_single_book(r#"{"title": " ", "author": "헤세"}"#),
            Err(BookMatchError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_book_list(r#"{"books": "데미안"}"#),
            Err(BookMatchError::MalformedResponse(_))
        ));
        assert!(matches!(
            decode_recommendation(r#"{"new_books": []}"#, &[]),
            Err(BookMatchError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn malformed_output_is_retried_until_it_decodes() {
        let llm = ScriptedLlm::new(vec![
            Ok("죄송합니다, 추천할 수 없습니다.".to_owned()),
            Ok(r#"{"title":"데미안","author":"헤르만 헤세"}"#.to_owned()),
        ]);

        let book = recommender(llm.clone())
            .request_replacement("성장 소설", &[TentativeBook::new("싯다르타", "헤세")])
            .await;

        assert_eq!(book, Ok(TentativeBook::new("데미안", "헤르만 헤세")));
        let requests = llm.requests.lock().await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].max_tokens, REPLACEMENT_MAX_TOKENS);
        assert!(requests[0].messages[1].content.contains("싯다르타"));
    }

    #[tokio::test]
    async fn exhausted_budget_yields_invalid_response() {
        let llm = ScriptedLlm::new(vec![
            Ok("not json".to_owned()),
            Ok("```json\n[]\n```".to_owned()),
            Ok("{}".to_owned()),
            Ok(r#"{"books":[]}"#.to_owned()),
        ]);

        let result = recommender(llm.clone()).recommend_from_owned(&[]).await;

        assert!(matches!(result, Err(BookMatchError::InvalidResponse { attempts: 3, .. })));
        assert_eq!(llm.requests.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn persistent_rate_limit_surfaces_as_rate_limited() {
        let llm = ScriptedLlm::new(vec![
            Err(LlmError::RateLimited),
            Err(LlmError::RateLimited),
            Err(LlmError::RateLimited),
        ]);

        let result = recommender(llm.clone())
            .request_replacement("성장 소설", &[TentativeBook::new("데미안", "헤르만 헤세")])
            .await;

        assert_eq!(result, Err(BookMatchError::RateLimited));
        assert_eq!(llm.requests.lock().await.len(), 3);
        assert_eq!(
            result.err().map(|error| error.user_message()),
            Some(BookMatchError::RateLimited.user_message())
        );
    }

    #[tokio::test]
    async fn unreachable_model_surfaces_as_upstream_failure() {
        let llm = ScriptedLlm::new(vec![
            Ok("   ".to_owned()),
            Err(LlmError::Transport("connection refused".to_owned())),
            Err(LlmError::Transport("connection refused".to_owned())),
        ]);

        let result = recommender(llm).describe("성장 소설", &[]).await;

        assert!(matches!(result, Err(BookMatchError::Upstream(message)) if message.contains("refused")));
    }

    #[tokio::test]
    async fn description_uses_description_model_and_rejects_blank_text() {
        let llm = ScriptedLlm::new(vec![Ok("   ".to_owned()), Ok("이 책들은 ...".to_owned())]);

        let description = recommender(llm.clone())
            .describe("성장 소설", &[TentativeBook::new("데미안", "헤르만 헤세")])
            .await;

        assert_eq!(description, Ok("이 책들은 ...".to_owned()));
        let requests = llm.requests.lock().await;
        assert_eq!(requests[0].model, "gpt-4o-mini");
        assert_eq!(requests[0].temperature, DESCRIPTION_TEMPERATURE);
    }

    #[tokio::test]
    async fn recommend_sends_question_and_owned_labels() {
        let owned = vec![OwnedBook::new("123", "Python 기초", "김철수")];
        let llm = ScriptedLlm::new(vec![Ok(r#"{"owned_books":[{"title":"Python 기초","author":"김철수"}],"new_books":[]}"#.to_owned())]);

        let recommendation = recommender(llm.clone())
            .recommend("프로그래밍 입문서 추천해주세요", &owned)
            .await
            .expect("recommendation succeeds");

        assert_eq!(recommendation.owned_matches, owned);
        let requests = llm.requests.lock().await;
        assert_eq!(requests[0].model, "gpt-4o");
        assert!(requests[0].messages[1].content.contains("Python 기초-김철수"));
    }
}
