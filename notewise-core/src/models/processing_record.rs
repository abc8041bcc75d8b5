use chrono::{DateTime, Utc};
use serde::Serialize;

use super::serialize_timestamp;
use crate::prompt::TransformationKind;

/// One AI transformation of note content. Holds the note id as a plain value;
/// the note may since have been deleted.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingRecord {
    pub process_id: i64,
    pub note_id: i64,
    pub process_type: String,
    pub original_content: String,
    pub processed_content: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub processed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProcessingRecord {
    pub note_id: i64,
    pub kind: TransformationKind,
    pub original_content: String,
    pub processed_content: String,
}
