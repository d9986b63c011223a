//! Configuration management
//!
//! Everything is read from the environment (a `.env` file is loaded by the binaries).
//! Missing provider settings do not abort startup; they are collected in
//! [`AppConfig::problems`] and reported by the query endpoint.

use anyhow::Result;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::llm::ollama_client::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
use crate::llm::openai_client::{DEFAULT_OPENAI_MODEL, DEFAULT_OPENAI_URL};
use crate::llm::{CompletionProvider, OllamaClient, OpenAiClient};

const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// HTTP bind settings
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    /// Any OpenAI-compatible chat completions endpoint
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => f.write_str("ollama"),
            Self::OpenAi => f.write_str("openai"),
        }
    }
}

/// Settings of one completion provider
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProviderConfig {
    /// Construct the client described by this configuration
    pub fn build(&self, timeout: Duration) -> Result<Arc<dyn CompletionProvider>> {
        let provider: Arc<dyn CompletionProvider> = match self.kind {
            ProviderKind::Ollama => Arc::new(OllamaClient::new(
                Some(self.base_url.clone()),
                Some(self.model.clone()),
                timeout,
            )?),
            ProviderKind::OpenAi => {
                let api_key = self
                    .api_key
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("API key missing for {} provider", self.kind))?;
                Arc::new(OpenAiClient::new(
                    Some(self.base_url.clone()),
                    Some(self.model.clone()),
                    api_key,
                    timeout,
                )?)
            }
        };
        Ok(provider)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgres,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub generation: ProviderConfig,
    pub validation: ProviderConfig,
    pub store: StoreBackend,
    pub database_url: Option<String>,
    pub llm_timeout: Duration,
    /// Human-readable configuration problems found while loading
    pub problems: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut problems = Vec::new();

        let mut server = ServerConfig::default();
        if let Some(host) = get("HOST") {
            server.host = host;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => server.port = port,
                Err(_) => problems.push(format!("PORT must be a port number, got '{}'", port)),
            }
        }

        let generation = provider_from(&get, "GENERATION", &mut problems);
        let validation = provider_from(&get, "VALIDATION", &mut problems);

        let store = match get("STORE_BACKEND").map(|v| v.to_lowercase()).as_deref() {
            None | Some("memory") => StoreBackend::Memory,
            Some("postgres") | Some("postgresql") => StoreBackend::Postgres,
            Some(other) => {
                problems.push(format!(
                    "STORE_BACKEND must be 'memory' or 'postgres', got '{}'",
                    other
                ));
                StoreBackend::Memory
            }
        };
        let database_url = get("DATABASE_URL");

        let llm_timeout = match get("LLM_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    problems.push(format!(
                        "LLM_TIMEOUT_SECS must be a positive integer, got '{}'",
                        raw
                    ));
                    Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS)
                }
            },
            None => Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
        };

        Self {
            server,
            generation,
            validation,
            store,
            database_url,
            llm_timeout,
            problems,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.problems.is_empty()
    }
}

fn provider_from<G>(get: &G, prefix: &str, problems: &mut Vec<String>) -> ProviderConfig
where
    G: Fn(&str) -> Option<String>,
{
    let var = |name: &str| format!("{}_{}", prefix, name);

    let kind = match get(&var("PROVIDER")).map(|v| v.to_lowercase()).as_deref() {
        None | Some("ollama") => ProviderKind::Ollama,
        Some("openai") => ProviderKind::OpenAi,
        Some(other) => {
            problems.push(format!(
                "{} must be 'ollama' or 'openai', got '{}'",
                var("PROVIDER"),
                other
            ));
            ProviderKind::Ollama
        }
    };

    let (default_url, default_model) = match kind {
        ProviderKind::Ollama => (DEFAULT_OLLAMA_URL, DEFAULT_OLLAMA_MODEL),
        ProviderKind::OpenAi => (DEFAULT_OPENAI_URL, DEFAULT_OPENAI_MODEL),
    };
    let api_key = get(&var("API_KEY"));
    if kind == ProviderKind::OpenAi && api_key.is_none() {
        problems.push(format!(
            "{} is required when {}=openai",
            var("API_KEY"),
            var("PROVIDER")
        ));
    }

    ProviderConfig {
        kind,
        base_url: get(&var("BASE_URL")).unwrap_or_else(|| default_url.to_string()),
        model: get(&var("MODEL")).unwrap_or_else(|| default_model.to_string()),
        api_key,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]);
        assert!(config.is_complete());
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.generation.kind, ProviderKind::Ollama);
        assert_eq!(config.generation.base_url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.validation.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.llm_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_openai_requires_key() {
        let config = load(&[("GENERATION_PROVIDER", "openai")]);
        assert!(!config.is_complete());
        assert_eq!(
            config.problems,
            vec!["GENERATION_API_KEY is required when GENERATION_PROVIDER=openai".to_string()]
        );
        assert_eq!(config.generation.base_url, DEFAULT_OPENAI_URL);
        assert!(config.generation.build(config.llm_timeout).is_err());
    }

    #[test]
    fn test_mixed_providers() {
        let config = load(&[
            ("GENERATION_PROVIDER", "OpenAI"),
            ("GENERATION_API_KEY", "sk-test"),
            ("GENERATION_BASE_URL", "https://api.groq.com/openai/v1"),
            ("GENERATION_MODEL", "llama-3.1-8b-instant"),
            ("VALIDATION_MODEL", "qwen2.5"),
            ("PORT", "3000"),
        ]);
        assert!(config.is_complete(), "{:?}", config.problems);
        assert_eq!(config.generation.kind, ProviderKind::OpenAi);
        assert_eq!(config.generation.model, "llama-3.1-8b-instant");
        assert_eq!(config.validation.kind, ProviderKind::Ollama);
        assert_eq!(config.validation.model, "qwen2.5");
        assert_eq!(config.server.port, 3000);
        assert!(config.generation.build(config.llm_timeout).is_ok());
    }

    #[test]
    fn test_bad_values_are_problems() {
        let config = load(&[
            ("PORT", "eighty"),
            ("VALIDATION_PROVIDER", "claude"),
            ("STORE_BACKEND", "sqlite"),
            ("LLM_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(config.problems.len(), 4);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.store, StoreBackend::Memory);
    }

    #[test]
    fn test_postgres_backend_reads_url() {
        let config = load(&[
            ("STORE_BACKEND", "postgres"),
            ("DATABASE_URL", "postgres://localhost/todos"),
        ]);
        assert_eq!(config.store, StoreBackend::Postgres);
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/todos")
        );
    }

    #[test]
    fn test_api_key_is_redacted_in_debug() {
        let config = load(&[("GENERATION_PROVIDER", "openai"), ("GENERATION_API_KEY", "sk-secret")]);
        assert!(!format!("{:?}", config.generation).contains("sk-secret"));
    }
}
