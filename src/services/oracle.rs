// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Generation oracle port.
//!
//! The gateway talks to the text/vision model only through
//! [`GenerationOracle`]. Production uses the Gemini client; tests and offline
//! development use [`ScriptedOracle`].

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;

/// One piece of request content.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub model: String,
    pub parts: Vec<ContentPart>,
    pub system_directive: Option<String>,
    /// Response schema; when set the answer must be JSON matching it.
    pub contract: Option<serde_json::Value>,
}

impl OracleRequest {
    pub fn text(model: &str, prompt: String) -> Self {
        Self {
            model: model.to_string(),
            parts: vec![ContentPart::Text(prompt)],
            system_directive: None,
            contract: None,
        }
    }

    pub fn with_contract(mut self, contract: serde_json::Value) -> Self {
        self.contract = Some(contract);
        self
    }

    pub fn with_system_directive(mut self, directive: String) -> Self {
        self.system_directive = Some(directive);
        self
    }

    pub fn with_image(mut self, mime_type: &str, data: Vec<u8>) -> Self {
        self.parts.push(ContentPart::InlineImage {
            mime_type: mime_type.to_string(),
            data,
        });
        self
    }

    /// Concatenated text parts, mostly useful for assertions.
    pub fn prompt_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text(text) => Some(text.as_str()),
                ContentPart::InlineImage { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Transport(String),

    #[error("oracle returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("oracle returned no content")]
    EmptyResponse,

    #[error("failed to decode oracle response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait GenerationOracle: Send + Sync {
    /// Run one generation call and return the raw response text.
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError>;
}

/// Oracle that replays queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedOracle {
    responses: Mutex<VecDeque<Result<String, OracleError>>>,
    requests: Mutex<Vec<OracleRequest>>,
    delay: Option<Duration>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every call for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn push_response(&self, body: impl Into<String>) {
        self.responses.lock().await.push_back(Ok(body.into()));
    }

    pub async fn push_json(&self, value: serde_json::Value) {
        self.push_response(value.to_string()).await;
    }

    pub async fn push_error(&self, error: OracleError) {
        self.responses.lock().await.push_back(Err(error));
    }

    pub async fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl GenerationOracle for ScriptedOracle {
    async fn generate(&self, request: OracleRequest) -> Result<String, OracleError> {
        self.requests.lock().await.push(request);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(OracleError::EmptyResponse))
    }
}
