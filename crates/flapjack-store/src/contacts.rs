use flapjack_models::{Contact, Id};
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

pub async fn get(pool: &PgPool, id: Id) -> StoreResult<Contact> {
    sqlx::query_as!(
        Contact,
        r#"SELECT id as "id!: Id", name, timezone FROM contacts WHERE id = $1"#,
        id as Id
    )
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound)
}

pub async fn list(pool: &PgPool) -> StoreResult<Vec<Contact>> {
    let rows = sqlx::query_as!(
        Contact,
        r#"SELECT id as "id!: Id", name, timezone FROM contacts"#
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn save(pool: &PgPool, contact: &Contact) -> StoreResult<()> {
    sqlx::query!(
        r#"
        INSERT INTO contacts(id, name, timezone) VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, timezone = EXCLUDED.timezone
        "#,
        contact.id as Id,
        contact.name,
        contact.timezone,
    )
    .execute(pool)
    .await?;
    Ok(())
}
