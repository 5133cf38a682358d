//! JSON handlers for the query, document, and status endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::{DateTime, Utc};
use ragroute_core::{
    ClassificationResult, DEFAULT_OWNER, Document, DocumentSource, Embedder, Error, StoreError, StoreStats, Strategy,
};
use ragroute_router::{Runtime, SourceRef, StatsSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info};

pub type SharedState = Arc<Runtime>;

const DEFAULT_SEARCH_TOP_K: usize = 5;
const DEFAULT_LIST_LIMIT: usize = 50;
const PREVIEW_CHARS: usize = 200;

/// Routes of the HTTP surface, without middleware.
pub fn api_router(state: SharedState) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/classify", post(classify_handler))
        .route("/add", post(add_handler))
        .route("/search", post(search_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .route("/documents", get(list_documents_handler).delete(clear_documents_handler))
        .route("/documents/stats", get(document_stats_handler))
        .route("/documents/{id}", delete(delete_document_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request, rendered as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Store(StoreError::InvalidOwner(_) | StoreError::DuplicateId(_)) => ApiError::BadRequest(e.to_string()),
            other => {
                error!(error = %other, "Request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Error::from(e).into()
    }
}

fn require(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(format!("{field} is required"))),
    }
}

fn owner_or_default(user_id: Option<String>) -> String {
    user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_OWNER.to_string())
}

// ── /query ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: Option<String>,
    pub user_id: Option<String>,
    /// Overrides the classifier's strategy.
    pub strategy: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Timing {
    pub total_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub classification: ClassificationResult,
    pub strategy: Strategy,
    pub sources: Vec<SourceRef>,
    pub timing: Timing,
    #[serde(default)]
    pub degraded: bool,
}

async fn query_handler(
    State(state): State<SharedState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(payload) = payload?;
    let question = require("question", payload.question)?;
    let owner = owner_or_default(payload.user_id);
    let forced = payload
        .strategy
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Strategy>())
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let outcome = state.router.route(&question, &owner, forced).await?;
    Ok(Json(QueryResponse {
        answer: outcome.answer,
        classification: outcome.classification,
        strategy: outcome.strategy,
        sources: outcome.sources,
        timing: Timing {
            total_ms: outcome.elapsed_ms,
        },
        degraded: outcome.degraded,
    }))
}

// ── /classify ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub question: Option<String>,
}

async fn classify_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let Json(payload) = payload?;
    let question = require("question", payload.question)?;
    Ok(Json(state.router.classify(&question)))
}

// ── /add ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddRequest {
    pub content: Option<String>,
    pub user_id: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddResponse {
    pub id: String,
    pub status: String,
}

async fn add_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AddRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddResponse>), ApiError> {
    let Json(payload) = payload?;
    let content = require("content", payload.content)?;
    let owner = owner_or_default(payload.user_id);
    let source = match payload.source {
        Some(s) => s.parse::<DocumentSource>().map_err(ApiError::BadRequest)?,
        None => DocumentSource::Manual,
    };

    let mut document = Document::new(content, owner.as_str(), source);
    document.metadata = payload.metadata;
    let id = state.router.add_document(document).await?;
    info!(owner = %owner, id = %id, source = %source, "Document added");

    Ok((
        StatusCode::CREATED,
        Json(AddResponse {
            id,
            status: "added".into(),
        }),
    ))
}

// ── /search ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub user_id: Option<String>,
    pub top_k: Option<usize>,
    pub min_score: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub source: DocumentSource,
    pub score: f32,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
}

async fn search_handler(
    State(state): State<SharedState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(payload) = payload?;
    let query = require("query", payload.query)?;
    let owner = owner_or_default(payload.user_id);
    let top_k = payload.top_k.unwrap_or(DEFAULT_SEARCH_TOP_K).max(1);
    let min_score = payload.min_score.unwrap_or(state.router.config().min_score);

    let hits = state.router.search(&query, &owner, top_k, min_score).await?;
    let results = hits
        .into_iter()
        .map(|hit| SearchHit {
            id: hit.document.id,
            content: hit.document.content,
            source: hit.document.source,
            score: hit.score,
            metadata: hit.document.metadata,
        })
        .collect();
    Ok(Json(SearchResponse { results }))
}

// ── /health and /stats ────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub embedding_model_loaded: bool,
    pub llm_available: bool,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        embedding_model_loaded: state.embeddings.is_loaded(),
        llm_available: state.router.llm_available().await,
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub usage: StatsSnapshot,
    pub embedding_model: String,
    pub embedding_backend: String,
    pub embedding_dim: usize,
    pub llm_available: bool,
}

async fn stats_handler(State(state): State<SharedState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        usage: state.router.stats(),
        embedding_model: state.embeddings.model_id().to_string(),
        embedding_backend: state.embeddings.backend().to_string(),
        embedding_dim: state.embeddings.dimension(),
        llm_available: state.router.llm_available().await,
    })
}

// ── /documents ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OwnerParams {
    pub user_id: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: String,
    pub content: String,
    pub source: DocumentSource,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentList {
    pub documents: Vec<DocumentSummary>,
}

async fn list_documents_handler(
    State(state): State<SharedState>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<DocumentList>, ApiError> {
    let owner = owner_or_default(params.user_id);
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let documents = state
        .router
        .store()
        .list(&owner, limit)
        .await?
        .into_iter()
        .map(|doc| DocumentSummary {
            content: doc.preview(PREVIEW_CHARS),
            id: doc.id,
            source: doc.source,
            created_at: doc.created_at,
        })
        .collect();
    Ok(Json(DocumentList { documents }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub id: String,
    pub status: String,
}

async fn delete_document_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let owner = owner_or_default(params.user_id);
    if !state.router.store().delete(&id, &owner).await? {
        return Err(ApiError::NotFound(format!("document {id} not found")));
    }
    info!(owner = %owner, id = %id, "Document deleted");
    Ok(Json(DeleteResponse {
        id,
        status: "deleted".into(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub removed: usize,
}

async fn clear_documents_handler(
    State(state): State<SharedState>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<ClearResponse>, ApiError> {
    let owner = owner_or_default(params.user_id);
    let removed = state.router.store().clear(&owner).await?;
    info!(owner = %owner, removed, "Documents cleared");
    Ok(Json(ClearResponse { removed }))
}

async fn document_stats_handler(
    State(state): State<SharedState>,
    Query(params): Query<OwnerParams>,
) -> Result<Json<StoreStats>, ApiError> {
    let owner = owner_or_default(params.user_id);
    Ok(Json(state.router.store().stats(&owner).await?))
}

// ── Tests ─────────────────────────────────────────────────────────────────
