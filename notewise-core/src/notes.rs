//! Note and history use-cases.
//!
//! Validates input before touching the store and turns missing rows into
//! explicit not-found errors. Deleting a note honours the configured
//! `OrphanPolicy`: only `Cascade` removes the note's history.

use std::sync::Arc;

use thiserror::Error;

use crate::error::StoreError;
use crate::models::{NewNote, Note, NoteUpdate, ProcessingRecord};
use crate::processing::OrphanPolicy;
use crate::store::{NoteStore, ProcessingStore};

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("Missing required fields: {0}")]
    Validation(&'static str),

    #[error("Note not found")]
    NoteNotFound(i64),

    #[error("AI history not found")]
    HistoryNotFound(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct NoteService {
    notes: Arc<dyn NoteStore>,
    history: Arc<dyn ProcessingStore>,
    orphan_policy: OrphanPolicy,
}

impl NoteService {
    pub fn new(
        notes: Arc<dyn NoteStore>,
        history: Arc<dyn ProcessingStore>,
        orphan_policy: OrphanPolicy,
    ) -> Self {
        Self {
            notes,
            history,
            orphan_policy,
        }
    }

    pub async fn create(&self, note: NewNote) -> Result<i64, NoteError> {
        if note.user_id == 0 {
            return Err(NoteError::Validation("userId"));
        }
        require_text(&note.title, "title")?;
        require_text(&note.content, "content")?;
        Ok(self.notes.create_note(note).await?)
    }

    pub async fn get(&self, note_id: i64) -> Result<Note, NoteError> {
        self.notes
            .get_note(note_id)
            .await?
            .ok_or(NoteError::NoteNotFound(note_id))
    }

    pub async fn list(&self, user_id: i64) -> Result<Vec<Note>, NoteError> {
        Ok(self.notes.list_notes(user_id).await?)
    }

    pub async fn update(&self, note_id: i64, update: NoteUpdate) -> Result<(), NoteError> {
        require_text(&update.title, "title")?;
        require_text(&update.content, "content")?;
        if !self.notes.update_note(note_id, update).await? {
            return Err(NoteError::NoteNotFound(note_id));
        }
        Ok(())
    }

    /// Under `Cascade` history is removed before the note; a failed history
    /// delete leaves the note intact.
    pub async fn delete(&self, note_id: i64) -> Result<(), NoteError> {
        if self.orphan_policy == OrphanPolicy::Cascade {
            if !self.notes.note_exists(note_id).await? {
                return Err(NoteError::NoteNotFound(note_id));
            }
            let removed = self.history.delete_records_for_note(note_id).await?;
            tracing::info!(note_id, removed, "Deleted processing history with note");
        }

        if !self.notes.delete_note(note_id).await? {
            return Err(NoteError::NoteNotFound(note_id));
        }
        Ok(())
    }

    /// Processing history for a note, newest first. An unknown note yields an
    /// empty list.
    pub async fn history(&self, note_id: i64) -> Result<Vec<ProcessingRecord>, NoteError> {
        Ok(self.history.list_records(note_id).await?)
    }

    pub async fn delete_history(&self, process_id: i64) -> Result<(), NoteError> {
        if !self.history.delete_record(process_id).await? {
            return Err(NoteError::HistoryNotFound(process_id));
        }
        Ok(())
    }
}

fn require_text(value: &str, field: &'static str) -> Result<(), NoteError> {
    if value.trim().is_empty() {
        return Err(NoteError::Validation(field));
    }
    Ok(())
}
