//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use todo_sql_engine::llm::{CompletionProvider, CompletionRequest};
use todo_sql_engine::storage::{InMemoryTaskStore, NewTask, TaskStore};
use todo_sql_engine::QueryPipeline;

/// Provider that answers with pre-scripted replies, in order
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
    reachable: bool,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
            reachable: true,
        })
    }

    /// Fails every call and reports itself down to health probes
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            reachable: false,
        })
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        Self::new(vec![Ok(reply)])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(vec![Err(message)])
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Err(anyhow::anyhow!("no scripted reply left")),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }

    async fn health_check(&self) -> anyhow::Result<bool> {
        Ok(self.reachable)
    }
}

pub const APPROVE: &str = r#"{"valid": true, "reason": "looks correct"}"#;

pub async fn store_with(titles: &[&str]) -> Arc<InMemoryTaskStore> {
    let store = Arc::new(InMemoryTaskStore::new());
    for title in titles {
        store.create(NewTask::new(*title)).await.unwrap();
    }
    store
}

pub fn pipeline(
    generation: Arc<ScriptedProvider>,
    validation: Arc<ScriptedProvider>,
    store: Arc<InMemoryTaskStore>,
) -> QueryPipeline {
    QueryPipeline::new(generation, validation, store)
}
