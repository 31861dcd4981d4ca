use flapjack_models::{Id, Medium, MediumType};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

struct MediumRow {
    id: Id,
    contact_id: Id,
    medium_type: MediumType,
    address: String,
    rollover_period_secs: i64,
    rollup_threshold: Option<i32>,
}

impl From<MediumRow> for Medium {
    fn from(row: MediumRow) -> Self {
        Medium {
            id: row.id,
            contact_id: row.contact_id,
            medium_type: row.medium_type,
            address: row.address,
            rollover_period_secs: row.rollover_period_secs,
            rollup_threshold: row.rollup_threshold.map(|v| v as u32),
        }
    }
}

pub async fn get(pool: &PgPool, id: Id) -> StoreResult<Medium> {
    sqlx::query_as!(
        MediumRow,
        r#"
        SELECT
            id as "id!: Id",
            contact_id as "contact_id!: Id",
            medium_type as "medium_type!: MediumType",
            address,
            rollover_period_secs,
            rollup_threshold as "rollup_threshold: i32"
        FROM media WHERE id = $1
        "#,
        id as Id
    )
    .fetch_optional(pool)
    .await?
    .map(Medium::from)
    .ok_or(StoreError::NotFound)
}

pub async fn for_contact(pool: &PgPool, contact_id: Id) -> StoreResult<Vec<Medium>> {
    let rows = sqlx::query_as!(
        MediumRow,
        r#"
        SELECT
            id as "id!: Id",
            contact_id as "contact_id!: Id",
            medium_type as "medium_type!: MediumType",
            address,
            rollover_period_secs,
            rollup_threshold as "rollup_threshold: i32"
        FROM media WHERE contact_id = $1
        "#,
        contact_id as Id
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(Medium::from)
    .collect();
    Ok(rows)
}

pub async fn save(pool: &PgPool, medium: &Medium) -> StoreResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO media(id, contact_id, medium_type, address, rollover_period_secs, rollup_threshold)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (id) DO UPDATE SET
            contact_id = EXCLUDED.contact_id,
            medium_type = EXCLUDED.medium_type,
            address = EXCLUDED.address,
            rollover_period_secs = EXCLUDED.rollover_period_secs,
            rollup_threshold = EXCLUDED.rollup_threshold
        "#,
        medium.id as Id,
        medium.contact_id as Id,
        medium.medium_type as MediumType,
        medium.address,
        medium.rollover_period_secs,
        medium.rollup_threshold.map(|v| v as i32),
    )
    .execute(pool)
    .await?;
    Ok(())
}
