//! OpenAI-compatible chat completion provider
//!
//! Any endpoint that speaks the `/chat/completions` protocol works, so the same
//! client covers hosted models and local gateways.

use crate::{
    error::{AppError, AppResult},
    services::providers::GenerativeProvider,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str =
    "You are a careful personal stylist. Only use item ids from the wardrobe you are given \
     and answer with a single JSON object.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
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
    #[serde(default)]
    content: Option<String>,
}

#[derive(Clone)]
pub struct ChatCompletionProvider {
    http_client: HttpClient,
    api_key: String,
    /// Base URL up to and including the version segment, e.g. `https://api.openai.com/v1`
    api_url: String,
    model: String,
    temperature: f32,
}

impl ChatCompletionProvider {
    pub fn new(api_key: String, api_url: String, model: String) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::invalid_input("chat completion API key cannot be empty"));
        }

        Ok(Self {
            http_client: HttpClient::new(),
            api_key,
            api_url,
            model,
            temperature: 0.7,
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
        }
    }
}

/// First non-empty message content of the response
fn reply_text(response: ChatResponse) -> AppResult<String> {
    response
        .choices
        .into_iter()
        .filter_map(|choice| choice.message.content)
        .find(|content| !content.trim().is_empty())
        .ok_or_else(|| AppError::ExternalApi("Chat completion returned no content".to_string()))
}

#[async_trait::async_trait]
impl GenerativeProvider for ChatCompletionProvider {
    fn name(&self) -> &'static str {
        "chat_completion"
    }

    async fn generate(&self, prompt: &str) -> AppResult<String> {
        let url = format!("{}/chat/completions", self.api_url.trim_end_matches('/'));

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Chat completion API returned status {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let text = reply_text(parsed)?;

        tracing::debug!(model = %self.model, chars = text.len(), "Received generated outfits");

        Ok(text)
    }
}
