pub mod config;
pub mod db;
pub mod error;
pub mod generation;
pub mod models;
pub mod notes;
pub mod processing;
pub mod prompt;
pub mod store;

pub use config::NotewiseConfig;
pub use error::{NotewiseError, StoreError};
pub use generation::{
    create_backend, GeminiConfig, GeminiGenerationClient, GenerationBackend, GenerationError,
    UnavailableBackend,
};
pub use notes::{NoteError, NoteService};
pub use processing::{
    HistoryStatus, OrphanPolicy, ProcessingError, ProcessingMode, ProcessingOptions,
    ProcessingOutcome, ProcessingRequest, ProcessingResult, Processor,
};
pub use prompt::{build_prompt, fallback_content, TransformationKind};
pub use store::{MemoryStore, NoteStore, PgStore, ProcessingStore};
