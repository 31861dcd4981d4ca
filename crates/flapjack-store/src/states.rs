use flapjack_models::{Condition, Id, State};
use sqlx::PgPool;

use crate::error::StoreResult;

pub async fn insert(pool: &PgPool, state: &State) -> StoreResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO states(id, check_id, condition, created_at, summary, details)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
        state.id as Id,
        state.check_id as Id,
        state.condition as Condition,
        state.created_at,
        state.summary,
        state.details,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn latest(pool: &PgPool, check_id: Id) -> StoreResult<Option<State>> {
    let row = sqlx::query_as!(
        State,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            condition as "condition!: Condition",
            created_at,
            summary,
            details
        FROM states WHERE check_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
        check_id as Id
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Reads the latest state for a check with its row lock held, for callers
/// already inside a [`crate::with_check_lock`] transaction.
pub async fn latest_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    check_id: Id,
) -> StoreResult<Option<State>> {
    let row = sqlx::query_as!(
        State,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            condition as "condition!: Condition",
            created_at,
            summary,
            details
        FROM states WHERE check_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
        check_id as Id
    )
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row)
}

/// SortedRange(State, check_id, created_at, lo, hi): the state history for a
/// check, oldest first, within a time window.
pub async fn range(
    pool: &PgPool,
    check_id: Id,
    lo: chrono::DateTime<chrono::Utc>,
    hi: chrono::DateTime<chrono::Utc>,
) -> StoreResult<Vec<State>> {
    let rows = sqlx::query_as!(
        State,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            condition as "condition!: Condition",
            created_at,
            summary,
            details
        FROM states
        WHERE check_id = $1 AND created_at >= $2 AND created_at < $3
        ORDER BY created_at ASC
        "#,
        check_id as Id,
        lo,
        hi
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
