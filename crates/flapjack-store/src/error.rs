/// Errors surfaced by every store operation. Mirrors the taxonomy in
/// spec.md §7: transient storage failures are distinguished from
/// not-found lookups so callers can decide retry vs. give-up.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("entity not found")]
    NotFound,

    #[error("database error")]
    Db(#[from] sqlx::Error),

    #[error("malformed stored value: {0}")]
    Decode(String),

    #[error("migration error")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub type StoreResult<T> = Result<T, StoreError>;
