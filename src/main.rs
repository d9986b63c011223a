use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use todo_sql_engine::config::{AppConfig, StoreBackend};
use todo_sql_engine::storage::{InMemoryTaskStore, PostgresTaskStore, TaskStore};
use todo_sql_engine::web::{start_server, AppState};
use todo_sql_engine::QueryPipeline;

async fn open_store(config: &AppConfig) -> Result<Arc<dyn TaskStore>> {
    match config.store {
        StoreBackend::Memory => Ok(Arc::new(InMemoryTaskStore::new())),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required when STORE_BACKEND=postgres")?;
            Ok(Arc::new(PostgresTaskStore::connect(url).await?))
        }
    }
}

fn build_state(config: &AppConfig, store: Arc<dyn TaskStore>) -> AppState {
    if !config.is_complete() {
        for problem in &config.problems {
            tracing::warn!(%problem, "Configuration problem");
        }
        return AppState::unconfigured(store, config.problems.clone());
    }

    let providers = config
        .generation
        .build(config.llm_timeout)
        .and_then(|generation| Ok((generation, config.validation.build(config.llm_timeout)?)));
    match providers {
        Ok((generation, validation)) => {
            tracing::info!(
                generation = generation.name(),
                validation = validation.name(),
                "Completion providers ready"
            );
            let pipeline = QueryPipeline::new(generation, validation, store.clone());
            AppState::new(store, Arc::new(pipeline))
        }
        Err(e) => {
            let problem = format!("{:#}", e);
            tracing::warn!(%problem, "Could not construct completion providers");
            AppState::unconfigured(store, vec![problem])
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();
    let store = open_store(&config).await?;
    tracing::info!(store = store.name(), "Task store ready");

    let state = build_state(&config, store);
    start_server(state, &config.server.bind_address()).await
}
