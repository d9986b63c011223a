//! LLM Module - completion providers and the two model-backed pipeline stages

pub mod provider;
pub mod ollama_client;
pub mod openai_client;
pub mod sql_generator;
pub mod validators;

pub use ollama_client::OllamaClient;
pub use openai_client::OpenAiClient;
pub use provider::{CompletionProvider, CompletionRequest};
pub use sql_generator::SqlGenerator;
pub use validators::{SqlValidator, Verdict, VerdictSource};
