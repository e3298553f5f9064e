use crate::prompt::{SYSTEM_PROMPT, TextBudget};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Turns extracted document text into a JSON description.
#[async_trait]
pub trait Structurer: Send + Sync {
    async fn structure(&self, text: &str) -> Result<String>;
}

/// Client for an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    model: String,
    api_key: String,
    budget: TextBudget,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        budget: TextBudget,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            budget,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Structurer for ChatClient {
    async fn structure(&self, text: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let text_to_send = self.budget.truncate(text);
        debug!(
            chars = text_to_send.chars().count(),
            truncated = text_to_send.len() < text.len(),
            "Sending text for structuring"
        );

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: text_to_send },
            ],
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send structuring request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Structuring request failed: {} {}", status, body.trim());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse structuring response")?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Structuring response contained no message")
    }
}
