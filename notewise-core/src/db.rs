use crate::config::DatabaseConfig;
use crate::error::NotewiseError;
use sqlx::{postgres::PgPoolOptions, PgPool};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS notes (
        note_id    BIGSERIAL PRIMARY KEY,
        user_id    BIGINT NOT NULL,
        title      TEXT NOT NULL,
        content    TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    // note_id carries no foreign key; history may outlive its note
    r#"
    CREATE TABLE IF NOT EXISTS ai_processing (
        process_id        BIGSERIAL PRIMARY KEY,
        note_id           BIGINT NOT NULL,
        process_type      TEXT NOT NULL,
        original_content  TEXT NOT NULL,
        processed_content TEXT NOT NULL,
        processed_at      TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_notes_user ON notes (user_id, updated_at DESC)",
    "CREATE INDEX IF NOT EXISTS idx_ai_processing_note ON ai_processing (note_id, processed_at DESC)",
];

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await
}

/// Connect and make sure the schema exists.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, NotewiseError> {
    let pool = create_pool(config).await?;
    ensure_schema(&pool).await?;
    Ok(pool)
}

/// Create the notes and history tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Database schema ensured");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> Result<String, sqlx::Error> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}
