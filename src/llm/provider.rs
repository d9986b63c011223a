//! Text-completion provider abstraction shared by the generator and the validator

use anyhow::Result;
use async_trait::async_trait;

/// One completion call
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend to constrain output to JSON when it supports that
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            temperature: 0.1,
            max_tokens: 256,
            json_mode: false,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// An external service that turns a prompt into unstructured text.
///
/// Replies are untrusted; callers extract and check whatever they need from them.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// Backend and model, for logs
    fn name(&self) -> &str;

    /// Whether the backend answers at all. Backends without a cheap probe report `true`.
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Cut a response body down for error messages
pub(crate) fn truncate_body(body: &str, max: usize) -> &str {
    match body.char_indices().nth(max) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
