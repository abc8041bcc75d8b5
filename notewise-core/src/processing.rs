//! AI processing orchestrator.
//!
//! Turns a `(kind, content, note_id?)` request into produced text:
//! - builds the prompt and calls the injected `GenerationBackend` once
//! - in lenient mode, a failed call is replaced with canned fallback text and
//!   only logged; strict mode surfaces it as `ProcessingError::Generation`
//! - when a non-zero note id is given, appends one history record; a storage
//!   failure downgrades the result to "not saved" instead of discarding it

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ProcessingConfig;
use crate::error::StoreError;
use crate::generation::{GenerationBackend, GenerationError};
use crate::models::NewProcessingRecord;
use crate::prompt::{build_prompt, fallback_content, TransformationKind};
use crate::store::{NoteStore, ProcessingStore};

/// What to do when the model call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// Substitute fallback content and report success.
    #[default]
    Lenient,
    /// Return the generation error to the caller.
    Strict,
}

/// How history records relate to notes that no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Insert without checking; deleting a note leaves its history behind.
    #[default]
    Keep,
    /// Refuse to record history for a note id that does not exist.
    Reject,
    /// Deleting a note also deletes its history.
    Cascade,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessingOptions {
    pub mode: ProcessingMode,
    pub orphan_policy: OrphanPolicy,
}

impl From<&ProcessingConfig> for ProcessingOptions {
    fn from(config: &ProcessingConfig) -> Self {
        Self {
            mode: config.mode,
            orphan_policy: config.orphan_policy,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub kind: TransformationKind,
    pub content: String,
    /// `None` or `Some(0)` means the result is not attached to a note.
    pub note_id: Option<i64>,
}

impl ProcessingRequest {
    pub fn new(kind: impl Into<String>, content: impl Into<String>, note_id: Option<i64>) -> Self {
        let kind: String = kind.into();
        Self {
            kind: TransformationKind::from(kind.as_str()),
            content: content.into(),
            note_id,
        }
    }

    fn history_note_id(&self) -> Option<i64> {
        self.note_id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingOutcome {
    ModelSuccess,
    ModelFailureRecovered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    /// No note id was supplied.
    NotRequested,
    Saved,
    /// The store refused or failed the insert.
    NotSaved,
}

/// Caller-facing envelope. Serializes to the `/processNote` response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    pub success: bool,
    pub message: String,
    pub processed_content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process_id: Option<i64>,
    pub outcome: ProcessingOutcome,
    pub history: HistoryStatus,
}

impl ProcessingResult {
    fn new(
        outcome: ProcessingOutcome,
        history: HistoryStatus,
        processed_content: String,
        process_id: Option<i64>,
    ) -> Self {
        let message = match (outcome, history) {
            (ProcessingOutcome::ModelSuccess, HistoryStatus::NotRequested) => {
                "Note processed successfully"
            }
            (ProcessingOutcome::ModelSuccess, HistoryStatus::Saved) => "Note processed and saved",
            (ProcessingOutcome::ModelSuccess, HistoryStatus::NotSaved) => {
                "Note processed (not saved to history)"
            }
            (ProcessingOutcome::ModelFailureRecovered, HistoryStatus::NotRequested) => {
                "Note processed with fallback"
            }
            (ProcessingOutcome::ModelFailureRecovered, HistoryStatus::Saved) => {
                "Note processed with fallback and saved"
            }
            (ProcessingOutcome::ModelFailureRecovered, HistoryStatus::NotSaved) => {
                "Note processed with fallback (not saved to history)"
            }
        };

        Self {
            success: true,
            message: message.to_string(),
            processed_content,
            process_id,
            outcome,
            history,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Missing required fields: {0}")]
    Validation(&'static str),

    #[error("AI processing failed: {0}")]
    Generation(#[from] GenerationError),
}

pub struct Processor {
    backend: Arc<dyn GenerationBackend>,
    history: Arc<dyn ProcessingStore>,
    notes: Arc<dyn NoteStore>,
    options: ProcessingOptions,
}

impl Processor {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        history: Arc<dyn ProcessingStore>,
        notes: Arc<dyn NoteStore>,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            backend,
            history,
            notes,
            options,
        }
    }

    pub fn options(&self) -> ProcessingOptions {
        self.options
    }

    pub async fn process(
        &self,
        request: ProcessingRequest,
    ) -> Result<ProcessingResult, ProcessingError> {
        validate(&request)?;

        let prompt = build_prompt(&request.kind, &request.content);

        let (produced, outcome) = match self.backend.generate(&prompt).await {
            Ok(text) => (text, ProcessingOutcome::ModelSuccess),
            Err(e) if self.options.mode == ProcessingMode::Strict => {
                tracing::error!(
                    backend = self.backend.name(),
                    kind = %request.kind,
                    error = %e,
                    "Generation failed (strict mode)"
                );
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    kind = %request.kind,
                    error = %e,
                    "Generation failed, returning fallback content"
                );
                (
                    fallback_content(&request.kind, &request.content),
                    ProcessingOutcome::ModelFailureRecovered,
                )
            }
        };

        let (history, process_id) = match request.history_note_id() {
            None => (HistoryStatus::NotRequested, None),
            Some(note_id) => match self.record(note_id, &request, &produced).await {
                Ok(process_id) => {
                    tracing::info!(note_id, process_id, kind = %request.kind, "Processing saved to history");
                    (HistoryStatus::Saved, Some(process_id))
                }
                Err(e) => {
                    tracing::error!(note_id, error = %e, "Error saving AI processing");
                    (HistoryStatus::NotSaved, None)
                }
            },
        };

        Ok(ProcessingResult::new(outcome, history, produced, process_id))
    }

    async fn record(
        &self,
        note_id: i64,
        request: &ProcessingRequest,
        produced: &str,
    ) -> Result<i64, StoreError> {
        if self.options.orphan_policy == OrphanPolicy::Reject
            && !self.notes.note_exists(note_id).await?
        {
            return Err(StoreError::OrphanRejected(note_id));
        }

        self.history
            .insert_record(NewProcessingRecord {
                note_id,
                kind: request.kind.clone(),
                original_content: request.content.clone(),
                processed_content: produced.to_string(),
            })
            .await
    }
}

fn validate(request: &ProcessingRequest) -> Result<(), ProcessingError> {
    if request.kind.as_str().is_empty() {
        return Err(ProcessingError::Validation("processType"));
    }
    if request.content.trim().is_empty() {
        return Err(ProcessingError::Validation("content"));
    }
    Ok(())
}
