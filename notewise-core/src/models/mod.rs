pub mod note;
pub mod processing_record;

pub use note::{NewNote, Note, NoteUpdate};
pub use processing_record::{NewProcessingRecord, ProcessingRecord};

use chrono::{DateTime, Utc};
use serde::Serializer;

/// Wire format for `createdAt`, `updatedAt` and `processedAt`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn serialize_timestamp<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&ts.format(TIMESTAMP_FORMAT))
}
