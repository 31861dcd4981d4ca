use flapjack_models::{Id, ScheduledMaintenance, UnscheduledMaintenance};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

/// A timestamp far enough in the future to mean "open-ended" without
/// needing a nullable `end_time` column — matches the partial unique index
/// in the schema that enforces at most one open unscheduled maintenance.
pub fn open_ended() -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::<chrono::Utc>::MAX_UTC
}

pub async fn schedule(pool: &PgPool, m: &ScheduledMaintenance) -> StoreResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO scheduled_maintenances(id, check_id, start_time, end_time, summary)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        m.id as Id,
        m.check_id as Id,
        m.start_time,
        m.end_time,
        m.summary,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_scheduled(pool: &PgPool, id: Id) -> StoreResult<ScheduledMaintenance> {
    sqlx::query_as!(
        ScheduledMaintenance,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            start_time,
            end_time,
            summary
        FROM scheduled_maintenances WHERE id = $1
        "#,
        id as Id,
    )
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound)
}

/// Ends a scheduled maintenance window early (spec.md §4.C): if `at` is at
/// or before the window's start, the window is deleted outright; if `at`
/// lands inside the window, its end is pulled in to `at`; if `at` is at or
/// past the window's natural end, this is a no-op. Returns whether the
/// window was actually shortened. Callers hold the check's lock and
/// re-fetch the row `FOR UPDATE` here to avoid racing a concurrent end.
pub async fn end_scheduled_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Id,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<bool> {
    let window = sqlx::query!(
        "SELECT start_time, end_time FROM scheduled_maintenances WHERE id = $1 FOR UPDATE",
        id as Id,
    )
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::NotFound)?;

    if at <= window.start_time {
        sqlx::query!("DELETE FROM scheduled_maintenances WHERE id = $1", id as Id)
            .execute(&mut **tx)
            .await?;
        return Ok(true);
    }
    if at < window.end_time {
        sqlx::query!(
            "UPDATE scheduled_maintenances SET end_time = $2 WHERE id = $1",
            id as Id,
            at,
        )
        .execute(&mut **tx)
        .await?;
        return Ok(true);
    }
    Ok(false)
}

pub async fn in_scheduled(
    pool: &PgPool,
    check_id: Id,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<Vec<ScheduledMaintenance>> {
    let rows = sqlx::query_as!(
        ScheduledMaintenance,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            start_time,
            end_time,
            summary
        FROM scheduled_maintenances
        WHERE check_id = $1 AND start_time <= $2 AND $2 < end_time
        "#,
        check_id as Id,
        at,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Opens a bounded `[start, end)` unscheduled maintenance window for an
/// acknowledgement (spec.md §4.C), truncating any unscheduled window
/// already covering `start` so the two never overlap. Distinct from
/// [`start_unscheduled`], which opens an indefinite window for an operator
/// directly silencing a check.
pub async fn acknowledge_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    check_id: Id,
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
    summary: Option<String>,
) -> StoreResult<()> {
    sqlx::query!(
        "UPDATE unscheduled_maintenances SET end_time = $2 WHERE check_id = $1 AND end_time > $2",
        check_id as Id,
        start,
    )
    .execute(&mut **tx)
    .await?;

    sqlx::query!(
        r#"
        INSERT INTO unscheduled_maintenances(id, check_id, start_time, end_time, summary)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        Id::generate() as Id,
        check_id as Id,
        start,
        end,
        summary,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Opens an unscheduled maintenance window with no end time, or extends the
/// currently open one. spec.md §3 invariant: at most one open unscheduled
/// maintenance per check, enforced here and by the schema's partial index.
pub async fn start_unscheduled(
    pool: &PgPool,
    check_id: Id,
    at: chrono::DateTime<chrono::Utc>,
    summary: Option<String>,
) -> StoreResult<UnscheduledMaintenance> {
    if let Some(existing) = current_unscheduled(pool, check_id, at).await? {
        return Ok(existing);
    }

    let id = Id::generate();
    sqlx::query!(
        r#"
        INSERT INTO unscheduled_maintenances(id, check_id, start_time, end_time, summary)
        VALUES ($1, $2, $3, $4, $5)
        "#,
        id as Id,
        check_id as Id,
        at,
        open_ended(),
        summary,
    )
    .execute(pool)
    .await?;

    Ok(UnscheduledMaintenance {
        id,
        check_id,
        start_time: at,
        end_time: open_ended(),
        summary,
    })
}

pub async fn end_unscheduled(
    pool: &PgPool,
    check_id: Id,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<()> {
    sqlx::query!(
        r#"
        UPDATE unscheduled_maintenances
        SET end_time = $2
        WHERE check_id = $1 AND end_time = $3
        "#,
        check_id as Id,
        at,
        open_ended(),
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn current_unscheduled(
    pool: &PgPool,
    check_id: Id,
    at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<Option<UnscheduledMaintenance>> {
    let row = sqlx::query_as!(
        UnscheduledMaintenance,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            start_time,
            end_time,
            summary
        FROM unscheduled_maintenances
        WHERE check_id = $1 AND start_time <= $2 AND $2 < end_time
        "#,
        check_id as Id,
        at,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
