// SPDX-License-Identifier: MIT OR Apache-2.0

//! Answer generation from retrieved label context.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::embedding::openai::{auth_headers, endpoint_url};

/// Question plus the label passages it must be answered from.
#[derive(Debug, Clone)]
pub struct GroundedPrompt<'a> {
    pub context: &'a str,
    pub question: &'a str,
}

impl GroundedPrompt<'_> {
    /// Prompt text sent to the model.
    pub fn render(&self) -> String {
        format!(
            "Use only this verified drug label:\n{}\n\nQuestion: {}",
            self.context, self.question
        )
    }
}

/// Turns a grounded prompt into prose.
pub trait AnswerGenerator: Send + Sync {
    fn generate(&self, prompt: &GroundedPrompt<'_>) -> Result<String>;
}

/// Chat completions client for OpenAI-compatible endpoints.
pub struct OpenAiChatGenerator {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiChatGenerator {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        temperature: f32,
        max_tokens: usize,
        timeout: Duration,
    ) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "missing OpenAI API key");
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(auth_headers(api_key)?)
            .build()
            .context("failed to build chat HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint_url(base_url, "chat/completions"),
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }
}

impl AnswerGenerator for OpenAiChatGenerator {
    fn generate(&self, prompt: &GroundedPrompt<'_>) -> Result<String> {
        let content = prompt.render();
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: &content,
            }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .context("failed to call chat completions")?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            anyhow::bail!("chat completions returned {}: {}", status, text.trim());
        }
        let parsed: ChatResponse = resp.json().context("failed to parse chat response")?;
        first_answer(parsed)
    }
}

fn first_answer(parsed: ChatResponse) -> Result<String> {
    parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .context("chat response contained no answer")
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt() {
        let prompt = GroundedPrompt {
            context: "Take 1 tablet twice daily with food.",
            question: "How often should I take this?",
        };
        assert_eq!(
            prompt.render(),
            "Use only this verified drug label:\nTake 1 tablet twice daily with food.\n\nQuestion: How often should I take this?"
        );
    }

    #[test]
    fn test_first_answer() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant", "content": "  Twice daily.  "}}]}"#,
        )
        .unwrap();
        assert_eq!(first_answer(parsed).unwrap(), "Twice daily.");
    }

    #[test]
    fn test_missing_answer_is_error() {
        let empty: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(first_answer(empty).is_err());

        let null: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"role": "assistant", "content": null}}]}"#,
        )
        .unwrap();
        assert!(first_answer(null).is_err());
    }

    #[test]
    fn test_request_shape() {
        let body = serde_json::to_value(ChatRequest {
            model: "gpt-4o-mini",
            temperature: 0.0,
            max_tokens: 700,
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
        })
        .unwrap();
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["max_tokens"], 700);
    }
}
