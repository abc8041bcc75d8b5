//! HTTP integration tests for the Notewise REST API
//!
//! The router is wired to the in-memory store and a scripted generation
//! backend, so these run without PostgreSQL or a Gemini key. Requests go
//! through the full axum stack via `oneshot`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use notewise_core::{
    GenerationBackend, GenerationError, MemoryStore, OrphanPolicy, ProcessingMode,
    ProcessingOptions, ProcessingStore,
};
use notewise_server::http::{build_router, HttpState};
use serde_json::{json, Value};
use tower::ServiceExt;

const MITOCHONDRIA: &str = "The mitochondria is the powerhouse of the cell.";
const MODEL_REPLY: &str = "A cell's mitochondria generate its energy.";

/// Replies with a fixed text, or fails every call when `reply` is `None`.
struct ScriptedBackend {
    reply: Option<&'static str>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(reply: Option<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.reply {
            Some(text) => Ok(text.to_string()),
            None => Err(GenerationError::RetryExhausted { attempts: 3 }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    backend: Arc<ScriptedBackend>,
}

fn test_app(reply: Option<&'static str>, options: ProcessingOptions) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let backend = ScriptedBackend::new(reply);
    let state = HttpState::new(None, store.clone(), backend.clone(), options);
    TestApp {
        router: build_router(Arc::new(state)),
        store,
        backend,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&b).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let resp = router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn create_note(router: &Router, user_id: i64, title: &str, content: &str) -> i64 {
    let (status, body) = send(
        router,
        "POST",
        "/createNote",
        Some(json!({ "userId": user_id, "title": title, "content": content })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "create failed: {:?}", body);
    body["noteId"].as_i64().expect("noteId")
}

// ===========================================================================
// Processing
// ===========================================================================

#[tokio::test]
async fn test_process_note_saves_history() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (status, body) = send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "summary", "content": MITOCHONDRIA, "noteId": 42 })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Note processed and saved");
    assert_eq!(body["processedContent"], MODEL_REPLY);
    assert!(body["processId"].as_i64().unwrap() > 0);

    let (status, history) = send(&app.router, "GET", "/getAIHistory/42", None).await;
    assert_eq!(status, StatusCode::OK);
    let records = history.as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["noteId"], 42);
    assert_eq!(records[0]["processType"], "summary");
    assert_eq!(records[0]["originalContent"], MITOCHONDRIA);
    assert_eq!(records[0]["processedContent"], MODEL_REPLY);
    assert!(records[0]["processedAt"].is_string());
}

#[tokio::test]
async fn test_process_note_without_note_id_is_not_saved() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (status, body) = send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "summary", "content": MITOCHONDRIA })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processedContent"], MODEL_REPLY);
    assert_eq!(body["message"], "Note processed successfully");
    assert!(body.get("processId").is_none());
    assert_eq!(app.store.record_count().await, 0);
}

#[tokio::test]
async fn test_process_note_missing_content_makes_no_model_call() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (status, body) = send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "summary", "content": "", "noteId": 1 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
    assert_eq!(app.backend.calls.load(Ordering::SeqCst), 0);
    assert_eq!(app.store.record_count().await, 0);
}

#[tokio::test]
async fn test_process_note_model_failure_returns_fallback() {
    let app = test_app(None, ProcessingOptions::default());

    let (status, body) = send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "bullet_points", "content": "x" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"], "model_failure_recovered");
    assert_eq!(
        body["processedContent"],
        "**Bullet Points:** • Main ideas extracted from note [Gemini AI unavailable]"
    );
}

#[tokio::test]
async fn test_process_note_strict_mode_reports_bad_gateway() {
    let options = ProcessingOptions {
        mode: ProcessingMode::Strict,
        ..Default::default()
    };
    let app = test_app(None, options);

    let (status, body) = send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "summary", "content": MITOCHONDRIA, "noteId": 9 })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
    assert_eq!(app.store.record_count().await, 0);
}

// ===========================================================================
// History
// ===========================================================================

#[tokio::test]
async fn test_delete_history_then_not_found() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (_, body) = send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "study_questions", "content": MITOCHONDRIA, "noteId": 5 })),
    )
    .await;
    let process_id = body["processId"].as_i64().unwrap();

    let uri = format!("/deleteAIHistory/{}", process_id);
    let (status, body) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "AI history deleted successfully");

    let (status, body) = send(&app.router, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "AI history not found");
}

#[tokio::test]
async fn test_history_newest_first() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    for kind in ["summary", "bullet_points"] {
        send(
            &app.router,
            "POST",
            "/processNote",
            Some(json!({ "processType": kind, "content": MITOCHONDRIA, "noteId": 8 })),
        )
        .await;
    }

    let (_, history) = send(&app.router, "GET", "/getAIHistory/8", None).await;
    let kinds: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["processType"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["bullet_points", "summary"]);
}

// ===========================================================================
// Notes CRUD
// ===========================================================================

#[tokio::test]
async fn test_note_lifecycle() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let note_id = create_note(&app.router, 1, "Biology", MITOCHONDRIA).await;

    let (status, note) = send(&app.router, "GET", &format!("/getNote/{}", note_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(note["noteId"], note_id);
    assert_eq!(note["userId"], 1);
    assert_eq!(note["title"], "Biology");
    assert_eq!(note["content"], MITOCHONDRIA);
    assert_eq!(note["createdAt"].as_str().unwrap().len(), "2026-01-01 00:00:00".len());

    let (status, body) = send(
        &app.router,
        "PUT",
        &format!("/updateNote/{}", note_id),
        Some(json!({ "title": "Cell biology", "content": "Updated." })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note updated");

    let (_, notes) = send(&app.router, "GET", "/getNotes/1", None).await;
    let notes = notes.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Cell biology");

    let (status, body) = send(&app.router, "DELETE", &format!("/deleteNote/{}", note_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Note deleted");

    let (status, body) = send(&app.router, "GET", &format!("/getNote/{}", note_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Note not found");
}

#[tokio::test]
async fn test_create_note_missing_fields() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (status, body) = send(
        &app.router,
        "POST",
        "/createNote",
        Some(json!({ "userId": 1, "title": "No body" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing required fields");
}

#[tokio::test]
async fn test_update_missing_note_is_not_found() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (status, _) = send(
        &app.router,
        "PUT",
        "/updateNote/999",
        Some(json!({ "title": "t", "content": "c" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_rejected() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());
    let (status, _) = send(&app.router, "GET", "/getNote/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_deleting_note_keeps_history_by_default() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());
    let note_id = create_note(&app.router, 1, "Biology", MITOCHONDRIA).await;

    send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "summary", "content": MITOCHONDRIA, "noteId": note_id })),
    )
    .await;
    send(&app.router, "DELETE", &format!("/deleteNote/{}", note_id), None).await;

    let (status, history) = send(&app.router, "GET", &format!("/getAIHistory/{}", note_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cascade_policy_deletes_history_with_note() {
    let options = ProcessingOptions {
        orphan_policy: OrphanPolicy::Cascade,
        ..Default::default()
    };
    let app = test_app(Some(MODEL_REPLY), options);
    let note_id = create_note(&app.router, 1, "Biology", MITOCHONDRIA).await;

    send(
        &app.router,
        "POST",
        "/processNote",
        Some(json!({ "processType": "summary", "content": MITOCHONDRIA, "noteId": note_id })),
    )
    .await;
    send(&app.router, "DELETE", &format!("/deleteNote/{}", note_id), None).await;

    assert!(app.store.list_records(note_id).await.unwrap().is_empty());
}

// ===========================================================================
// Service endpoints
// ===========================================================================

#[tokio::test]
async fn test_version_and_health_endpoints() {
    let app = test_app(Some(MODEL_REPLY), ProcessingOptions::default());

    let (status, version) = send(&app.router, "GET", "/version", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(version["protocol"], "notewise/1");

    let (status, health) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["storage"], "memory");
}
