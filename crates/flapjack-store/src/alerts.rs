use flapjack_models::{Alert, Condition, Id, MediumType, NotificationType};
use sqlx::PgPool;

use crate::error::StoreResult;

pub async fn insert(pool: &PgPool, alert: &Alert) -> StoreResult<()> {
    let rollup_ids: Option<Vec<uuid::Uuid>> = alert
        .rollup_check_ids
        .as_ref()
        .map(|ids| ids.iter().map(Id::as_uuid).collect());

    sqlx::query!(
        r#"
        INSERT INTO alerts(
            id, check_id, contact_id, medium_id, medium_type, notification_type,
            condition, summary, details, attempts, enqueued_at, wake_at, rollup_check_ids
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12)
        "#,
        alert.id as Id,
        alert.check_id as Id,
        alert.contact_id as Id,
        alert.medium_id as Id,
        alert.medium_type as MediumType,
        alert.notification_type as NotificationType,
        alert.condition as Condition,
        alert.summary,
        alert.details,
        alert.attempts,
        alert.enqueued_at,
        rollup_ids.as_deref(),
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Dequeues up to `limit` alerts ready for delivery through `medium_type`:
/// their backoff has elapsed (`wake_at < NOW()`) and no worker is currently
/// holding them (`heartbeat` stale). Mirrors the task-executor dequeue
/// pattern: a `FOR UPDATE SKIP LOCKED` pick followed by an `UPDATE ...
/// RETURNING` that stamps a fresh heartbeat in the same statement.
pub async fn dequeue_ready(
    pool: &PgPool,
    medium_type: MediumType,
    heartbeat_timeout: std::time::Duration,
    limit: i64,
) -> StoreResult<Vec<Alert>> {
    let heartbeat_timeout = sqlx::postgres::types::PgInterval::try_from(heartbeat_timeout)
        .map_err(|e| crate::error::StoreError::Decode(e.to_string()))?;
    let rows = sqlx::query_as!(
        Alert,
        r#"
        WITH picked AS (
            SELECT id
            FROM alerts
            WHERE
                medium_type = $1 AND
                wake_at < NOW() AND
                heartbeat < NOW() - $2::INTERVAL
            ORDER BY wake_at ASC
            LIMIT $3
            FOR UPDATE SKIP LOCKED
        )
        UPDATE alerts
        SET heartbeat = NOW()
        WHERE id IN (SELECT id FROM picked)
        RETURNING
            id as "id!: Id",
            check_id as "check_id!: Id",
            contact_id as "contact_id!: Id",
            medium_id as "medium_id!: Id",
            medium_type as "medium_type!: MediumType",
            notification_type as "notification_type!: NotificationType",
            condition as "condition!: Condition",
            summary,
            details,
            attempts,
            enqueued_at,
            rollup_check_ids as "rollup_check_ids: Vec<Id>"
        "#,
        medium_type as MediumType,
        heartbeat_timeout,
        limit,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn delete(pool: &PgPool, id: Id) -> StoreResult<()> {
    sqlx::query!("DELETE FROM alerts WHERE id = $1", id as Id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Bumps `attempts` and reschedules `wake_at` per an exponential backoff
/// decision made by the caller (spec.md §4.E).
pub async fn reschedule(
    pool: &PgPool,
    id: Id,
    wake_at: chrono::DateTime<chrono::Utc>,
) -> StoreResult<()> {
    sqlx::query!(
        r#"
        UPDATE alerts
        SET attempts = attempts + 1, wake_at = $2, heartbeat = '-infinity'
        WHERE id = $1
        "#,
        id as Id,
        wake_at,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Counts alerts currently queued for `medium_id`, used to decide whether
/// delivery should roll up into a digest (spec.md §4.D rollup threshold).
pub async fn count_for_medium(pool: &PgPool, medium_id: Id) -> StoreResult<i64> {
    let row = sqlx::query!(
        r#"SELECT COUNT(*) as "count!" FROM alerts WHERE medium_id = $1"#,
        medium_id as Id
    )
    .fetch_one(pool)
    .await?;
    Ok(row.count)
}

pub async fn count_for_medium_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    medium_id: Id,
) -> StoreResult<i64> {
    let row = sqlx::query!(
        r#"SELECT COUNT(*) as "count!" FROM alerts WHERE medium_id = $1"#,
        medium_id as Id
    )
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.count)
}

/// Locks and removes every currently-queued alert for `medium_id`, skipping
/// any a dispatcher worker already holds for delivery. Used to collapse a
/// medium's backlog into a single rollup digest once its threshold is
/// crossed (spec.md §4.D); rows a worker is actively delivering are left
/// alone and complete individually.
pub async fn claim_for_medium_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    medium_id: Id,
) -> StoreResult<Vec<Alert>> {
    let rows = sqlx::query_as!(
        Alert,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            contact_id as "contact_id!: Id",
            medium_id as "medium_id!: Id",
            medium_type as "medium_type!: MediumType",
            notification_type as "notification_type!: NotificationType",
            condition as "condition!: Condition",
            summary,
            details,
            attempts,
            enqueued_at,
            rollup_check_ids as "rollup_check_ids: Vec<Id>"
        FROM alerts WHERE medium_id = $1
        FOR UPDATE SKIP LOCKED
        "#,
        medium_id as Id,
    )
    .fetch_all(&mut **tx)
    .await?;

    if !rows.is_empty() {
        let ids: Vec<uuid::Uuid> = rows.iter().map(|a| a.id.as_uuid()).collect();
        sqlx::query!("DELETE FROM alerts WHERE id = ANY($1)", &ids)
            .execute(&mut **tx)
            .await?;
    }

    Ok(rows)
}

pub async fn insert_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    alert: &Alert,
) -> StoreResult<()> {
    let rollup_ids: Option<Vec<uuid::Uuid>> = alert
        .rollup_check_ids
        .as_ref()
        .map(|ids| ids.iter().map(Id::as_uuid).collect());

    sqlx::query!(
        r#"
        INSERT INTO alerts(
            id, check_id, contact_id, medium_id, medium_type, notification_type,
            condition, summary, details, attempts, enqueued_at, wake_at, rollup_check_ids
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11, $12)
        "#,
        alert.id as Id,
        alert.check_id as Id,
        alert.contact_id as Id,
        alert.medium_id as Id,
        alert.medium_type as MediumType,
        alert.notification_type as NotificationType,
        alert.condition as Condition,
        alert.summary,
        alert.details,
        alert.attempts,
        alert.enqueued_at,
        rollup_ids.as_deref(),
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}
