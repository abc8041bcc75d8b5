//! Persistence seams for notes and processing history.
//!
//! `PgStore` is the production implementation; `MemoryStore` backs tests and
//! local runs without a database. Both provide atomic single-row writes only.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{NewNote, NewProcessingRecord, Note, NoteUpdate, ProcessingRecord};

#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Insert a note and return its new identifier.
    async fn create_note(&self, note: NewNote) -> Result<i64, StoreError>;

    async fn get_note(&self, note_id: i64) -> Result<Option<Note>, StoreError>;

    /// Notes owned by `user_id`, most recently updated first.
    async fn list_notes(&self, user_id: i64) -> Result<Vec<Note>, StoreError>;

    /// Replace title and body and bump `updated_at`. Returns false when the
    /// note does not exist.
    async fn update_note(&self, note_id: i64, update: NoteUpdate) -> Result<bool, StoreError>;

    async fn delete_note(&self, note_id: i64) -> Result<bool, StoreError>;

    async fn note_exists(&self, note_id: i64) -> Result<bool, StoreError> {
        Ok(self.get_note(note_id).await?.is_some())
    }
}

/// Append-only history of AI transformations.
#[async_trait]
pub trait ProcessingStore: Send + Sync {
    async fn insert_record(&self, record: NewProcessingRecord) -> Result<i64, StoreError>;

    /// Records for a note, newest first.
    async fn list_records(&self, note_id: i64) -> Result<Vec<ProcessingRecord>, StoreError>;

    async fn delete_record(&self, process_id: i64) -> Result<bool, StoreError>;

    async fn delete_records_for_note(&self, note_id: i64) -> Result<u64, StoreError>;
}
