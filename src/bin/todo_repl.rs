use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use todo_sql_engine::config::{AppConfig, StoreBackend};
use todo_sql_engine::storage::{InMemoryTaskStore, PostgresTaskStore, Task, TaskStore};
use todo_sql_engine::{QueryPipeline, QueryResponse};

fn print_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("   (no tasks)");
        return;
    }
    println!("{:>6} | {:^4} | {:<40} | {}", "id", "done", "title", "created");
    println!("{}", "-".repeat(80));
    for task in tasks {
        println!(
            "{:>6} | {:^4} | {:<40} | {}",
            task.id.0,
            if task.completed { "x" } else { " " },
            task.title,
            task.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }
}

fn print_response(response: &QueryResponse) {
    for milestone in &response.milestones {
        println!("   - {}", milestone);
    }
    println!();
    if response.success {
        if let Some(sql) = &response.sql {
            println!(" SQL: {}", sql);
        }
        if let Some(message) = &response.message {
            println!(" {}", message);
        }
        if let Some(data) = &response.data {
            print_tasks(&data.items);
        }
    } else {
        println!(
            " ERROR ({}): {}",
            response.status,
            response.error.as_deref().unwrap_or("unknown error")
        );
        if let Some(suggestion) = &response.suggestion {
            println!(" Suggested SQL: {}", suggestion);
        }
    }
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AppConfig::from_env();
    if !config.is_complete() {
        anyhow::bail!("configuration incomplete: {}", config.problems.join("; "));
    }

    let store: Arc<dyn TaskStore> = match config.store {
        StoreBackend::Memory => Arc::new(InMemoryTaskStore::new()),
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required when STORE_BACKEND=postgres")?;
            Arc::new(PostgresTaskStore::connect(url).await?)
        }
    };
    let generation = config.generation.build(config.llm_timeout)?;
    let validation = config.validation.build(config.llm_timeout)?;

    println!(" Todo SQL Engine - Interactive Mode");
    println!("{}", "=".repeat(80));
    println!(" Store: {}", store.name());
    println!(" Generation: {}   Validation: {}", generation.name(), validation.name());
    println!(" Type a command such as 'add a task to buy milk' ('exit' to quit)");
    println!("{}", "=".repeat(80));
    println!();

    let pipeline = QueryPipeline::new(generation, validation, store);
    for provider in pipeline.provider_health().await {
        if !provider.reachable {
            println!(" WARNING: {} provider {} is not reachable", provider.role, provider.name);
        }
    }
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("todo> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();

        match line {
            "" => continue,
            "exit" | "quit" => break,
            _ => {
                let response = pipeline.run(line).await;
                print_response(&response);
            }
        }
    }

    println!(" Goodbye!");
    Ok(())
}
