use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::error::PipelineError;
use crate::pipeline::{QueryPipeline, QueryResponse};
use crate::storage::{ListQuery, NewTask, StoreError, Task, TaskFilter, TaskId, TaskPatch, TaskStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    /// Absent when provider configuration is incomplete
    pub pipeline: Option<Arc<QueryPipeline>>,
    pub config_problems: Arc<Vec<String>>,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, pipeline: Arc<QueryPipeline>) -> Self {
        Self {
            store,
            pipeline: Some(pipeline),
            config_problems: Arc::new(Vec::new()),
        }
    }

    /// State for a server whose query endpoint cannot run
    pub fn unconfigured(store: Arc<dyn TaskStore>, problems: Vec<String>) -> Self {
        Self {
            store,
            pipeline: None,
            config_problems: Arc::new(problems),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/query", post(run_query))
        .route("/todos", get(list_todos).post(create_todo))
        .route("/todos/:id", patch(update_todo).delete(delete_todo))
        .route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the web server
pub async fn start_server(state: AppState, bind_address: &str) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    tracing::info!(address = %bind_address, "Server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

fn envelope(response: QueryResponse) -> (StatusCode, Json<QueryResponse>) {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(response))
}

async fn run_query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> (StatusCode, Json<QueryResponse>) {
    let Some(pipeline) = state.pipeline.as_ref() else {
        let err = PipelineError::configuration(state.config_problems.join("; "));
        tracing::error!(error = %err, "Query refused");
        return envelope(QueryResponse::rejected(err.status_code(), err.to_string()));
    };

    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            return envelope(QueryResponse::rejected(
                400,
                format!("Invalid request body: {}", rejection.body_text()),
            ));
        }
    };

    let query = request.query.unwrap_or_default();
    envelope(pipeline.run(&query).await)
}

/// Error body of the task routes
struct ApiError(StatusCode, String);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidRecord(message) => Self(StatusCode::BAD_REQUEST, message),
            StoreError::Backend(message) => {
                tracing::error!(error = %message, "Task store failure");
                Self(StatusCode::INTERNAL_SERVER_ERROR, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = state.store.list(&ListQuery::newest_first()).await?;
    Ok(Json(tasks))
}

async fn create_todo(
    State(state): State<AppState>,
    Json(task): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let created = state.store.create(task).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    if patch.is_empty() {
        return Err(ApiError(
            StatusCode::BAD_REQUEST,
            "nothing to update: supply title or completed".to_string(),
        ));
    }
    let selector = TaskFilter::Id(TaskId(id));
    if state.store.update(&selector, &patch).await? == 0 {
        return Err(ApiError(StatusCode::NOT_FOUND, format!("task {} not found", id)));
    }
    state
        .store
        .list(&ListQuery::filtered(selector))
        .await?
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("task {} not found", id)))
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    match state.store.delete(&TaskFilter::Id(TaskId(id))).await? {
        0 => Err(ApiError(StatusCode::NOT_FOUND, format!("task {} not found", id))),
        _ => Ok(StatusCode::NO_CONTENT),
    }
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let probe = ListQuery {
        limit: Some(1),
        ..ListQuery::default()
    };
    let store_reachable = match state.store.list(&probe).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Health probe could not reach the task store");
            false
        }
    };
    let providers = match state.pipeline.as_ref() {
        Some(pipeline) => pipeline.provider_health().await,
        None => Vec::new(),
    };
    let healthy = store_reachable
        && state.pipeline.is_some()
        && providers.iter().all(|provider| provider.reachable);

    Json(serde_json::json!({
        "status": if healthy { "ok" } else { "degraded" },
        "store": state.store.name(),
        "storeReachable": store_reachable,
        "queryEnabled": state.pipeline.is_some(),
        "providers": providers,
        "configProblems": state.config_problems.as_ref(),
    }))
}
