//! SEO keyword suggestions from a free-text description.
//!
//! [`OpenAiKeywordGenerator`] asks the chat completions endpoint for a
//! comma-separated keyword list and splits the answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::openai::{ensure_api_success, OpenAiConfig, OpenAiConnection, OpenAiError};

pub const DEFAULT_KEYWORD_MODEL: &str = "gpt-4";

const SYSTEM_PROMPT: &str =
    "You are an SEO expert. Provide specific, relevant keywords based on the given description.";

/// Produces search keywords for a description.
#[async_trait]
pub trait KeywordGenerator: Send + Sync {
    async fn generate(&self, description: &str) -> Result<Vec<String>, OpenAiError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// [`KeywordGenerator`] backed by OpenAI chat completions.
#[derive(Debug)]
pub struct OpenAiKeywordGenerator {
    connection: OpenAiConnection,
    model: String,
}

impl OpenAiKeywordGenerator {
    pub fn new(config: OpenAiConfig, model: impl Into<String>) -> Result<Self, OpenAiError> {
        Ok(Self {
            connection: OpenAiConnection::new(config)?,
            model: model.into(),
        })
    }
}

#[async_trait]
impl KeywordGenerator for OpenAiKeywordGenerator {
    async fn generate(&self, description: &str) -> Result<Vec<String>, OpenAiError> {
        let prompt = user_prompt(description);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.7,
        };

        tracing::debug!(model = %self.model, "Requesting SEO keywords");
        let response = self
            .connection
            .post("chat/completions")
            .json(&request)
            .send()
            .await?;
        let response = ensure_api_success(response).await?;

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| OpenAiError::Payload("no message content in response".into()))?;

        let keywords = split_keywords(&content);
        tracing::info!(count = keywords.len(), "Generated SEO keywords");
        Ok(keywords)
    }
}

fn user_prompt(description: &str) -> String {
    format!(
        "Generate a list of relevant SEO keywords based on the following description. \
         The keywords should be specific, relevant, and optimized for search engines.\n\n\
         Description: {description}\n\n\
         Please provide only the keywords, separated by commas."
    )
}

/// Split a comma-separated answer into trimmed, non-empty keywords.
pub fn split_keywords(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
