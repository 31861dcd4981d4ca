use sqlx::PgPool;

use crate::error::StoreResult;

/// A raw inbound event as appended by the Event Receiver, before the Check
/// Processor has parsed and validated its payload.
pub struct InboundEvent {
    pub id: i64,
    pub payload: serde_json::Value,
    pub received_at: chrono::DateTime<chrono::Utc>,
}

pub async fn append(pool: &PgPool, payload: &serde_json::Value) -> StoreResult<i64> {
    let row = sqlx::query!(
        r#"INSERT INTO inbound_events(payload) VALUES ($1) RETURNING id"#,
        payload,
    )
    .fetch_one(pool)
    .await?;
    Ok(row.id)
}

/// Dequeues up to `limit` unconsumed events, oldest first, marking them
/// consumed in the same statement so a crashed worker's in-flight events are
/// picked up again once its lock is released rather than lost.
pub async fn dequeue(pool: &PgPool, limit: i64) -> StoreResult<Vec<InboundEvent>> {
    let rows = sqlx::query_as!(
        InboundEvent,
        r#"
        WITH picked AS (
            SELECT id
            FROM inbound_events
            WHERE consumed_at IS NULL
            ORDER BY id ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
        )
        UPDATE inbound_events
        SET consumed_at = NOW()
        WHERE id IN (SELECT id FROM picked)
        RETURNING id, payload, received_at
        "#,
        limit,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
