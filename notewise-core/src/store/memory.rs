use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NoteStore, ProcessingStore};
use crate::error::StoreError;
use crate::models::{NewNote, NewProcessingRecord, Note, NoteUpdate, ProcessingRecord};

#[derive(Debug, Default)]
struct MemoryState {
    notes: BTreeMap<i64, Note>,
    records: BTreeMap<i64, ProcessingRecord>,
    next_note_id: i64,
    next_process_id: i64,
}

/// In-process store with the same ordering and identifier semantics as
/// `PgStore`. Identifiers start at 1.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of history records, across all notes.
    pub async fn record_count(&self) -> usize {
        self.state.read().await.records.len()
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn create_note(&self, note: NewNote) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        state.next_note_id += 1;
        let note_id = state.next_note_id;
        let now = Utc::now();
        state.notes.insert(
            note_id,
            Note {
                note_id,
                user_id: note.user_id,
                title: note.title,
                content: note.content,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(note_id)
    }

    async fn get_note(&self, note_id: i64) -> Result<Option<Note>, StoreError> {
        Ok(self.state.read().await.notes.get(&note_id).cloned())
    }

    async fn list_notes(&self, user_id: i64) -> Result<Vec<Note>, StoreError> {
        let state = self.state.read().await;
        let mut notes: Vec<Note> = state
            .notes
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.note_id.cmp(&a.note_id))
        });
        Ok(notes)
    }

    async fn update_note(&self, note_id: i64, update: NoteUpdate) -> Result<bool, StoreError> {
        let mut state = self.state.write().await;
        match state.notes.get_mut(&note_id) {
            Some(note) => {
                note.title = update.title;
                note.content = update.content;
                note.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_note(&self, note_id: i64) -> Result<bool, StoreError> {
        Ok(self.state.write().await.notes.remove(&note_id).is_some())
    }
}

#[async_trait]
impl ProcessingStore for MemoryStore {
    async fn insert_record(&self, record: NewProcessingRecord) -> Result<i64, StoreError> {
        let mut state = self.state.write().await;
        state.next_process_id += 1;
        let process_id = state.next_process_id;
        state.records.insert(
            process_id,
            ProcessingRecord {
                process_id,
                note_id: record.note_id,
                process_type: record.kind.to_string(),
                original_content: record.original_content,
                processed_content: record.processed_content,
                processed_at: Utc::now(),
            },
        );
        Ok(process_id)
    }

    async fn list_records(&self, note_id: i64) -> Result<Vec<ProcessingRecord>, StoreError> {
        let state = self.state.read().await;
        let mut records: Vec<ProcessingRecord> = state
            .records
            .values()
            .filter(|r| r.note_id == note_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| b.process_id.cmp(&a.process_id))
        });
        Ok(records)
    }

    async fn delete_record(&self, process_id: i64) -> Result<bool, StoreError> {
        Ok(self.state.write().await.records.remove(&process_id).is_some())
    }

    async fn delete_records_for_note(&self, note_id: i64) -> Result<u64, StoreError> {
        let mut state = self.state.write().await;
        let before = state.records.len();
        state.records.retain(|_, r| r.note_id != note_id);
        Ok((before - state.records.len()) as u64)
    }
}
