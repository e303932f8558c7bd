//! Blocking client for a local Ollama daemon

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ModelError, ModelResult};

use super::{ModelInvoker, SYSTEM_PROMPT};

pub struct OllamaInvoker {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl OllamaInvoker {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> ModelResult<Self> {
        // Local models can take minutes on long emails; the run is
        // sequential and tolerates per-call latency.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(ModelError::request)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }
}

impl ModelInvoker for OllamaInvoker {
    fn generate(&self, prompt: &str) -> ModelResult<String> {
        let request = ChatRequest {
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
            stream: false,
        };

        let url = format!("{}/api/chat", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .map_err(ModelError::request)?
            .error_for_status()
            .map_err(ModelError::request)?;

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| ModelError::MalformedReply(e.to_string()))?;
        Ok(parsed.message.content)
    }
}
