use async_trait::async_trait;
use sqlx::PgPool;

use super::{NoteStore, ProcessingStore};
use crate::error::StoreError;
use crate::models::{NewNote, NewProcessingRecord, Note, NoteUpdate, ProcessingRecord};

/// PostgreSQL-backed note and history store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn create_note(&self, note: NewNote) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO notes (user_id, title, content)
            VALUES ($1, $2, $3)
            RETURNING note_id
            "#,
        )
        .bind(note.user_id)
        .bind(&note.title)
        .bind(&note.content)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(note_id = row.0, user_id = note.user_id, "Note created");
        Ok(row.0)
    }

    async fn get_note(&self, note_id: i64) -> Result<Option<Note>, StoreError> {
        let note = sqlx::query_as::<_, Note>(
            r#"
            SELECT note_id, user_id, title, content, created_at, updated_at
            FROM notes
            WHERE note_id = $1
            "#,
        )
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(note)
    }

    async fn list_notes(&self, user_id: i64) -> Result<Vec<Note>, StoreError> {
        let notes = sqlx::query_as::<_, Note>(
            r#"
            SELECT note_id, user_id, title, content, created_at, updated_at
            FROM notes
            WHERE user_id = $1
            ORDER BY updated_at DESC, note_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    async fn update_note(&self, note_id: i64, update: NoteUpdate) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE notes SET title = $1, content = $2, updated_at = now() WHERE note_id = $3",
        )
        .bind(&update.title)
        .bind(&update.content)
        .bind(note_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_note(&self, note_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM notes WHERE note_id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn note_exists(&self, note_id: i64) -> Result<bool, StoreError> {
        let row: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM notes WHERE note_id = $1)")
            .bind(note_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}

#[async_trait]
impl ProcessingStore for PgStore {
    async fn insert_record(&self, record: NewProcessingRecord) -> Result<i64, StoreError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO ai_processing (note_id, process_type, original_content, processed_content)
            VALUES ($1, $2, $3, $4)
            RETURNING process_id
            "#,
        )
        .bind(record.note_id)
        .bind(record.kind.as_str())
        .bind(&record.original_content)
        .bind(&record.processed_content)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.0)
    }

    async fn list_records(&self, note_id: i64) -> Result<Vec<ProcessingRecord>, StoreError> {
        let records = sqlx::query_as::<_, ProcessingRecord>(
            r#"
            SELECT process_id, note_id, process_type, original_content, processed_content, processed_at
            FROM ai_processing
            WHERE note_id = $1
            ORDER BY processed_at DESC, process_id DESC
            "#,
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn delete_record(&self, process_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM ai_processing WHERE process_id = $1")
            .bind(process_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_records_for_note(&self, note_id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM ai_processing WHERE note_id = $1")
            .bind(note_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
