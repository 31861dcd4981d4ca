//! The shared entity store every Flapjack component reads and writes
//! through. Backed by Postgres: entities are plain tables, relations are
//! join tables or foreign keys, and the abstract contract spec.md §6 asks
//! for (`Get`, `Save`, `Delete`, `FindByIndex`, `SortedRange`, and a
//! composable multi-key `Lock`) is expressed as typed functions per entity
//! rather than a single generic dispatch, which is the shape `control`'s
//! repo layer already uses for this kind of thing.

pub mod alerts;
pub mod checks;
pub mod contacts;
mod error;
pub mod events;
mod lock;
pub mod maintenances;
pub mod media;
pub mod notifications;
pub mod rules;
pub mod routes;
pub mod states;

pub use error::{StoreError, StoreResult};
pub use lock::with_check_lock;

pub use crate::events::InboundEvent;

/// A cheaply-clonable handle on the store. Every component is handed one of
/// these explicitly at construction time rather than reaching for a global
/// connection pool, per the "no global state" design note: there is no
/// `OnceCell<PgPool>` anywhere in this crate.
#[derive(Clone)]
pub struct Store {
    pool: sqlx::PgPool,
}

impl Store {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Store { pool }
    }

    pub fn pool(&self) -> &sqlx::PgPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}
