//! Notewise HTTP API
//!
//! Axum server exposing note CRUD, AI processing and processing history.
//! Route names and JSON field names match what the notes web UI calls.
//!
//! Architecture: each endpoint has a thin axum handler that delegates to a pure
//! inner function returning `(StatusCode, serde_json::Value)`. The inner
//! functions are directly testable without axum dispatch machinery.
//!
//! Endpoints:
//! - GET    /health                       — health check with DB status
//! - GET    /version                      — server version info
//! - POST   /processNote                  — run an AI transformation
//! - GET    /getAIHistory/:noteId         — processing history, newest first
//! - DELETE /deleteAIHistory/:processId   — delete one history record
//! - GET    /getNotes/:userId             — notes for a user, most recent first
//! - GET    /getNote/:noteId              — single note
//! - POST   /createNote                   — create a note
//! - PUT    /updateNote/:noteId           — replace title and body
//! - DELETE /deleteNote/:noteId           — delete a note

use std::sync::Arc;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use notewise_core::config::HttpConfig;
use notewise_core::models::{NewNote, NoteUpdate};
use notewise_core::{
    GenerationBackend, MemoryStore, NoteError, NoteService, NoteStore, NotewiseConfig,
    NotewiseError, PgStore, ProcessingError, ProcessingOptions, ProcessingRequest,
    ProcessingStore, Processor,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared state for all HTTP handlers
#[derive(Clone)]
pub struct HttpState {
    /// `None` when running on the in-memory store.
    pub pool: Option<PgPool>,
    pub notes: Arc<NoteService>,
    pub processor: Arc<Processor>,
}

impl HttpState {
    /// Wire services over one store that holds both notes and history.
    pub fn new<S>(
        pool: Option<PgPool>,
        store: Arc<S>,
        backend: Arc<dyn GenerationBackend>,
        options: ProcessingOptions,
    ) -> Self
    where
        S: NoteStore + ProcessingStore + 'static,
    {
        let notes: Arc<dyn NoteStore> = store.clone();
        let history: Arc<dyn ProcessingStore> = store;
        Self {
            pool,
            notes: Arc::new(NoteService::new(
                notes.clone(),
                history.clone(),
                options.orphan_policy,
            )),
            processor: Arc::new(Processor::new(backend, history, notes, options)),
        }
    }

    /// Build state from config: PostgreSQL when a pool is given, otherwise
    /// the in-memory store.
    pub fn from_config(config: &NotewiseConfig, pool: Option<PgPool>) -> Result<Self, NotewiseError> {
        let backend: Arc<dyn GenerationBackend> =
            Arc::from(notewise_core::create_backend(&config.generation, None)?);
        tracing::info!(backend = backend.name(), model = %config.generation.model, "Generation backend ready");

        let options = ProcessingOptions::from(&config.processing);
        Ok(match pool {
            Some(pool) => Self::new(Some(pool.clone()), Arc::new(PgStore::new(pool)), backend, options),
            None => Self::new(None, Arc::new(MemoryStore::new()), backend, options),
        })
    }
}

/// Build the Axum router with all endpoints
pub fn build_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/version", get(version_handler))
        .route("/processNote", post(process_note_handler))
        .route("/getAIHistory/:noteId", get(history_handler))
        .route("/deleteAIHistory/:processId", delete(delete_history_handler))
        .route("/getNotes/:userId", get(list_notes_handler))
        .route("/getNote/:noteId", get(get_note_handler))
        .route("/createNote", post(create_note_handler))
        .route("/updateNote/:noteId", put(update_note_handler))
        .route("/deleteNote/:noteId", delete(delete_note_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the HTTP server on the configured address.
/// Gracefully shuts down when the broadcast shutdown signal fires.
pub async fn start_http_server(
    state: HttpState,
    config: &HttpConfig,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);

    let app = build_router(Arc::new(state));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Notewise HTTP API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
            tracing::info!("HTTP server shutting down...");
        })
        .await?;

    Ok(())
}

// ============================================================================
// Request DTOs
// ============================================================================

// Fields are optional so a missing field becomes our own 400, not a 422
// from the JSON extractor.

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProcessNoteRequest {
    pub note_id: Option<i64>,
    pub process_type: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

fn error_body(message: impl Into<String>) -> serde_json::Value {
    json!({ "error": message.into() })
}

fn note_error_response(e: NoteError) -> (StatusCode, serde_json::Value) {
    match e {
        NoteError::Validation(_) => (StatusCode::BAD_REQUEST, error_body("Missing required fields")),
        NoteError::NoteNotFound(_) | NoteError::HistoryNotFound(_) => {
            (StatusCode::NOT_FOUND, error_body(e.to_string()))
        }
        NoteError::Store(e) => {
            tracing::error!(error = %e, "Database error");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body("Database error"))
        }
    }
}

fn success(message: &str) -> serde_json::Value {
    json!({ "message": message, "success": true })
}

// ============================================================================
// Inner (directly testable) business logic functions
// ============================================================================

/// Inner health check — queries DB and returns (status_code, json_body).
pub async fn health_inner(pool: Option<&PgPool>) -> (StatusCode, serde_json::Value) {
    let pool = match pool {
        Some(p) => p,
        None => {
            return (
                StatusCode::OK,
                json!({
                    "status": "healthy",
                    "version": env!("CARGO_PKG_VERSION"),
                    "storage": "memory",
                }),
            );
        }
    };

    match notewise_core::db::health_check(pool).await {
        Ok(pg_ver) => (
            StatusCode::OK,
            json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "storage": "postgresql",
                "postgresql": pg_ver,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({
                "status": "unhealthy",
                "error": e.to_string(),
            }),
        ),
    }
}

/// Inner version — returns version info (pure, no IO).
pub fn version_inner() -> serde_json::Value {
    json!({
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "notewise/1",
    })
}

/// Inner process — runs the processing pipeline.
pub async fn process_note_inner(
    processor: &Processor,
    req: ProcessNoteRequest,
) -> (StatusCode, serde_json::Value) {
    let request = ProcessingRequest::new(
        req.process_type.unwrap_or_default(),
        req.content.unwrap_or_default(),
        req.note_id,
    );

    match processor.process(request).await {
        Ok(result) => (StatusCode::OK, json!(result)),
        Err(ProcessingError::Validation(_)) => {
            (StatusCode::BAD_REQUEST, error_body("Missing required fields"))
        }
        Err(e @ ProcessingError::Generation(_)) => (
            StatusCode::BAD_GATEWAY,
            json!({ "error": e.to_string(), "success": false }),
        ),
    }
}

pub async fn history_inner(notes: &NoteService, note_id: i64) -> (StatusCode, serde_json::Value) {
    match notes.history(note_id).await {
        Ok(records) => (StatusCode::OK, json!(records)),
        Err(e) => note_error_response(e),
    }
}

pub async fn delete_history_inner(
    notes: &NoteService,
    process_id: i64,
) -> (StatusCode, serde_json::Value) {
    match notes.delete_history(process_id).await {
        Ok(()) => (StatusCode::OK, success("AI history deleted successfully")),
        Err(e) => note_error_response(e),
    }
}

pub async fn list_notes_inner(notes: &NoteService, user_id: i64) -> (StatusCode, serde_json::Value) {
    match notes.list(user_id).await {
        Ok(list) => (StatusCode::OK, json!(list)),
        Err(e) => note_error_response(e),
    }
}

pub async fn get_note_inner(notes: &NoteService, note_id: i64) -> (StatusCode, serde_json::Value) {
    match notes.get(note_id).await {
        Ok(note) => (StatusCode::OK, json!(note)),
        Err(e) => note_error_response(e),
    }
}

pub async fn create_note_inner(
    notes: &NoteService,
    req: CreateNoteRequest,
) -> (StatusCode, serde_json::Value) {
    let note = NewNote {
        user_id: req.user_id.unwrap_or_default(),
        title: req.title.unwrap_or_default(),
        content: req.content.unwrap_or_default(),
    };

    match notes.create(note).await {
        Ok(note_id) => (
            StatusCode::OK,
            json!({ "message": "Note created", "noteId": note_id, "success": true }),
        ),
        Err(e) => note_error_response(e),
    }
}

pub async fn update_note_inner(
    notes: &NoteService,
    note_id: i64,
    req: UpdateNoteRequest,
) -> (StatusCode, serde_json::Value) {
    let update = NoteUpdate {
        title: req.title.unwrap_or_default(),
        content: req.content.unwrap_or_default(),
    };

    match notes.update(note_id, update).await {
        Ok(()) => (StatusCode::OK, success("Note updated")),
        Err(e) => note_error_response(e),
    }
}

pub async fn delete_note_inner(notes: &NoteService, note_id: i64) -> (StatusCode, serde_json::Value) {
    match notes.delete(note_id).await {
        Ok(()) => (StatusCode::OK, success("Note deleted")),
        Err(e) => note_error_response(e),
    }
}

// ============================================================================
// Axum handler wrappers (thin — delegate to inner functions)
// ============================================================================

pub async fn health_handler(State(state): State<Arc<HttpState>>) -> impl IntoResponse {
    let (status, body) = health_inner(state.pool.as_ref()).await;
    (status, Json(body))
}

pub async fn version_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(version_inner()))
}

pub async fn process_note_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<ProcessNoteRequest>,
) -> impl IntoResponse {
    let (status, body) = process_note_inner(&state.processor, req).await;
    (status, Json(body))
}

pub async fn history_handler(
    State(state): State<Arc<HttpState>>,
    Path(note_id): Path<i64>,
) -> impl IntoResponse {
    let (status, body) = history_inner(&state.notes, note_id).await;
    (status, Json(body))
}

pub async fn delete_history_handler(
    State(state): State<Arc<HttpState>>,
    Path(process_id): Path<i64>,
) -> impl IntoResponse {
    let (status, body) = delete_history_inner(&state.notes, process_id).await;
    (status, Json(body))
}

pub async fn list_notes_handler(
    State(state): State<Arc<HttpState>>,
    Path(user_id): Path<i64>,
) -> impl IntoResponse {
    let (status, body) = list_notes_inner(&state.notes, user_id).await;
    (status, Json(body))
}

pub async fn get_note_handler(
    State(state): State<Arc<HttpState>>,
    Path(note_id): Path<i64>,
) -> impl IntoResponse {
    let (status, body) = get_note_inner(&state.notes, note_id).await;
    (status, Json(body))
}

pub async fn create_note_handler(
    State(state): State<Arc<HttpState>>,
    Json(req): Json<CreateNoteRequest>,
) -> impl IntoResponse {
    let (status, body) = create_note_inner(&state.notes, req).await;
    (status, Json(body))
}

pub async fn update_note_handler(
    State(state): State<Arc<HttpState>>,
    Path(note_id): Path<i64>,
    Json(req): Json<UpdateNoteRequest>,
) -> impl IntoResponse {
    let (status, body) = update_note_inner(&state.notes, note_id, req).await;
    (status, Json(body))
}

pub async fn delete_note_handler(
    State(state): State<Arc<HttpState>>,
    Path(note_id): Path<i64>,
) -> impl IntoResponse {
    let (status, body) = delete_note_inner(&state.notes, note_id).await;
    (status, Json(body))
}

// ============================================================================
// Unit Tests — call inner functions directly
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use notewise_core::UnavailableBackend;

    fn memory_state() -> HttpState {
        HttpState::new(
            None,
            Arc::new(MemoryStore::new()),
            Arc::new(UnavailableBackend),
            ProcessingOptions::default(),
        )
    }

    #[test]
    fn test_version_inner_pure() {
        let v = version_inner();
        assert!(v["version"].is_string(), "version must be string");
        assert_eq!(v["protocol"], "notewise/1");
    }

    #[tokio::test]
    async fn test_health_inner_memory_store() {
        let (status, body) = health_inner(None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_process_inner_missing_fields() {
        let state = memory_state();

        let (status, body) = process_note_inner(&state.processor, ProcessNoteRequest::default()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");

        let req = ProcessNoteRequest {
            note_id: None,
            process_type: Some("summary".to_string()),
            content: None,
        };
        let (status, _) = process_note_inner(&state.processor, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_process_inner_without_key_uses_fallback() {
        let state = memory_state();
        let req = ProcessNoteRequest {
            note_id: Some(0),
            process_type: Some("study_questions".to_string()),
            content: Some("Plate tectonics".to_string()),
        };

        let (status, body) = process_note_inner(&state.processor, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Note processed with fallback");
        assert!(body["processedContent"]
            .as_str()
            .unwrap()
            .starts_with("**Study Questions:**"));
        assert!(body.get("processId").is_none());
    }

    #[tokio::test]
    async fn test_create_inner_missing_fields() {
        let state = memory_state();
        let req = CreateNoteRequest {
            user_id: Some(1),
            title: Some("Title".to_string()),
            content: None,
        };
        let (status, body) = create_note_inner(&state.notes, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields");
    }

    #[tokio::test]
    async fn test_not_found_inner_responses() {
        let state = memory_state();

        let (status, body) = get_note_inner(&state.notes, 404).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Note not found");

        let (status, _) = delete_note_inner(&state.notes, 404).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = delete_history_inner(&state.notes, 404).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "AI history not found");
    }

    #[tokio::test]
    async fn test_history_inner_unknown_note_is_empty_list() {
        let state = memory_state();
        let (status, body) = history_inner(&state.notes, 12345).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }
}
