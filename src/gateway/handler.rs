//! HTTP API handlers
//!
//! | Method | Path                      | Description                       |
//! |--------|---------------------------|-----------------------------------|
//! | GET    | `/health`                 | Liveness probe                    |
//! | GET    | `/api/status`             | Gateway state, model, memory count |
//! | POST   | `/api/process`            | Process one URL                   |
//! | GET    | `/api/memories/:user_id`  | All memories of a user            |
//! | POST   | `/api/search`             | Substring search over memories    |
//! | POST   | `/api/batch`              | Process up to 20 URLs             |
//! | POST   | `/api/classify`           | Classify and route raw text       |

use crate::agent::{BatchItem, ProcessOutcome, ProcessReport};
use crate::error::Error;
use crate::extract::ExtractOptions;
use crate::gateway::Gateway;
use crate::memory::MemoryEntry;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Build the complete HTTP application with CORS and request tracing
pub fn build_app(gateway: Arc<Gateway>) -> Router {
    let cors = build_cors(&gateway.config().gateway.cors_origins);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/status", get(get_status))
        .route("/api/process", post(process_url))
        .route("/api/memories/:user_id", get(list_memories))
        .route("/api/search", post(search_memories))
        .route("/api/batch", post(process_batch))
        .route("/api/classify", post(classify_text))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Error body: `{"status": "error", "error": ..., "error_type": ...}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    error_type: &'static str,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            error_type: "invalid_request",
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::InvalidRequest(_) | Error::Fetch(_) => StatusCode::BAD_REQUEST,
            Error::Quota(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", err);
        }
        Self {
            status,
            message: err.to_string(),
            error_type: err.kind(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": "error",
            "error": self.message,
            "error_type": self.error_type,
        });
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

// =============================================================================
// Health and status
// =============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// GET /health
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/status
async fn get_status(State(gateway): State<Arc<Gateway>>) -> impl IntoResponse {
    Json(gateway.status().await)
}

// =============================================================================
// Processing
// =============================================================================

#[derive(Debug, Deserialize)]
struct ProcessRequest {
    #[serde(default)]
    url: String,
    user_id: Option<String>,
    #[serde(default)]
    options: ExtractOptions,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ProcessResponse {
    Success {
        status: &'static str,
        #[serde(flatten)]
        report: Box<ProcessReport>,
    },
    Duplicate {
        status: &'static str,
        existing_memory_id: Uuid,
        message: String,
    },
}

impl From<ProcessOutcome> for ProcessResponse {
    fn from(outcome: ProcessOutcome) -> Self {
        match outcome {
            ProcessOutcome::Processed(report) => Self::Success {
                status: "success",
                report,
            },
            ProcessOutcome::Duplicate { existing_memory_id } => Self::Duplicate {
                status: "duplicate",
                existing_memory_id,
                message: "Content already exists in memory".to_string(),
            },
        }
    }
}

fn resolve_user(gateway: &Gateway, user_id: Option<String>) -> String {
    user_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| gateway.default_user_id().to_string())
}

/// POST /api/process
async fn process_url(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> ApiResult<ProcessResponse> {
    let Json(request) = payload?;
    let url = request.url.trim();
    if url.is_empty() {
        return Err(ApiError::bad_request("No URL provided"));
    }

    let user_id = resolve_user(&gateway, request.user_id);
    let outcome = gateway
        .agent()
        .process(url, &user_id, &request.options)
        .await?;

    Ok(Json(outcome.into()))
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    #[serde(default)]
    urls: Vec<String>,
    user_id: Option<String>,
    #[serde(default)]
    options: ExtractOptions,
}

#[derive(Debug, Serialize)]
struct BatchResponse {
    status: &'static str,
    results: Vec<BatchItem>,
}

/// POST /api/batch
async fn process_batch(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> ApiResult<BatchResponse> {
    let Json(request) = payload?;
    let user_id = resolve_user(&gateway, request.user_id);

    let results = gateway
        .agent()
        .process_batch(&request.urls, &user_id, &request.options)
        .await?;

    Ok(Json(BatchResponse {
        status: "success",
        results,
    }))
}

// =============================================================================
// Memories
// =============================================================================

#[derive(Debug, Serialize)]
struct MemoriesResponse {
    status: &'static str,
    memories: Vec<MemoryEntry>,
}

/// GET /api/memories/:user_id
async fn list_memories(
    State(gateway): State<Arc<Gateway>>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    Json(MemoriesResponse {
        status: "success",
        memories: gateway.agent().store().list(&user_id).await,
    })
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    user_id: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    status: &'static str,
    results: Vec<MemoryEntry>,
}

/// POST /api/search
async fn search_memories(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<SearchResponse> {
    let Json(request) = payload?;
    let user_id = resolve_user(&gateway, request.user_id);
    let limit = request
        .limit
        .unwrap_or(gateway.config().memory.search_limit);

    let results = gateway
        .agent()
        .store()
        .search(&user_id, &request.query, limit)
        .await;

    Ok(Json(SearchResponse {
        status: "success",
        results,
    }))
}

// =============================================================================
// Classification
// =============================================================================

#[derive(Debug, Deserialize)]
struct ClassifyRequest {
    #[serde(default)]
    text: String,
}

/// POST /api/classify
async fn classify_text(
    State(gateway): State<Arc<Gateway>>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let Json(request) = payload?;
    let result = gateway.agent().classifier().classify_detailed(&request.text);
    let scores: serde_json::Map<String, serde_json::Value> = result
        .scores
        .iter()
        .map(|s| (s.content_type.to_string(), s.score.into()))
        .collect();

    Ok(Json(serde_json::json!({
        "content_type": result.content_type,
        "scores": scores,
        "routes": gateway.agent().router().route(result.content_type),
    })))
}
