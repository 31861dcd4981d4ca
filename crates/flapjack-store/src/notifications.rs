use flapjack_models::{Condition, Id, Notification, NotificationType};
use sqlx::PgPool;

use crate::error::StoreResult;

pub async fn insert(pool: &PgPool, notification: &Notification) -> StoreResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO notifications(id, check_id, state_id, notification_type, condition, summary, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
        notification.id as Id,
        notification.check_id as Id,
        notification.state_id as Id,
        notification.notification_type as NotificationType,
        notification.condition as Condition,
        notification.summary,
        notification.created_at,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Inserts a notification already marked `routed`, for callers (such as an
/// acknowledgement) that deliver alerts synchronously and don't want the
/// async Route Resolver to process this notification a second time.
pub async fn insert_routed_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    notification: &Notification,
) -> StoreResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO notifications(id, check_id, state_id, notification_type, condition, summary, created_at, routed)
        VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE)
        "#,
        notification.id as Id,
        notification.check_id as Id,
        notification.state_id as Id,
        notification.notification_type as NotificationType,
        notification.condition as Condition,
        notification.summary,
        notification.created_at,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Dequeues up to `limit` notifications the Route Resolver hasn't routed
/// yet, oldest first, skipping rows another worker already holds.
pub async fn dequeue_unrouted(pool: &PgPool, limit: i64) -> StoreResult<Vec<Notification>> {
    let rows = sqlx::query_as!(
        Notification,
        r#"
        WITH picked AS (
            SELECT id
            FROM notifications
            WHERE NOT routed
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        UPDATE notifications
        SET routed = TRUE
        WHERE id IN (SELECT id FROM picked)
        RETURNING
            id as "id!: Id",
            check_id as "check_id!: Id",
            state_id as "state_id!: Id",
            notification_type as "notification_type!: NotificationType",
            condition as "condition!: Condition",
            summary,
            created_at
        "#,
        limit,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
