use flapjack_models::Id;
use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;

use crate::error::StoreResult;

/// Runs `f` with row-level locks held on every check in `check_ids`, for the
/// duration of a single transaction. This is the store's composable
/// "lock these classes, run this operation" primitive (spec.md §5): callers
/// that touch more than one check's state (the Check Processor transitioning
/// a check, the Route Resolver updating `alerting_media` on several checks
/// for a rollup) go through here instead of taking ad-hoc locks themselves.
///
/// Ids are sorted before locking so that two calls contending on overlapping
/// sets always acquire row locks in the same order, which rules out
/// deadlocks between them.
pub async fn with_check_lock<F, Fut, T>(pool: &PgPool, check_ids: &[Id], f: F) -> StoreResult<T>
where
    F: FnOnce(Transaction<'static, Postgres>) -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut ids: Vec<uuid::Uuid> = check_ids.iter().map(Id::as_uuid).collect();
    ids.sort();
    ids.dedup();

    let mut tx = pool.begin().await?;
    sqlx::query!(
        r#"SELECT id FROM checks WHERE id = ANY($1) ORDER BY id FOR UPDATE"#,
        &ids
    )
    .fetch_all(&mut *tx)
    .await?;

    f(tx).await
}
