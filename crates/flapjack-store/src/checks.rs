use flapjack_models::{Check, Condition, Id};
use sqlx::PgPool;
use std::collections::BTreeSet;

use crate::error::{StoreError, StoreResult};

struct CheckRow {
    id: Id,
    name: String,
    enabled: bool,
    condition: Condition,
    failing: bool,
    notification_count: i64,
    initial_failure_delay_secs: i64,
    repeat_failure_delay_secs: i64,
    failing_since: Option<chrono::DateTime<chrono::Utc>>,
    last_problem_notified_at: Option<chrono::DateTime<chrono::Utc>>,
    most_severe: Option<Condition>,
}

impl CheckRow {
    fn into_check(self, alerting_media: Vec<Id>) -> Check {
        Check {
            id: self.id,
            name: self.name,
            enabled: self.enabled,
            condition: self.condition,
            failing: self.failing,
            notification_count: self.notification_count,
            initial_failure_delay_secs: self.initial_failure_delay_secs,
            repeat_failure_delay_secs: self.repeat_failure_delay_secs,
            failing_since: self.failing_since,
            last_problem_notified_at: self.last_problem_notified_at,
            most_severe: self.most_severe,
            alerting_media,
        }
    }
}

async fn fetch_alerting_media(pool: &PgPool, check_id: Id) -> StoreResult<Vec<Id>> {
    let ids = sqlx::query!(
        r#"SELECT medium_id as "medium_id!: Id" FROM check_alerting_media WHERE check_id = $1"#,
        check_id as Id
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| row.medium_id)
    .collect();
    Ok(ids)
}

pub async fn get(pool: &PgPool, id: Id) -> StoreResult<Check> {
    let row = sqlx::query_as!(
        CheckRow,
        r#"
        SELECT
            id as "id!: Id",
            name,
            enabled,
            condition as "condition!: Condition",
            failing,
            notification_count,
            initial_failure_delay_secs,
            repeat_failure_delay_secs,
            failing_since,
            last_problem_notified_at,
            most_severe as "most_severe: Condition"
        FROM checks WHERE id = $1
        "#,
        id as Id
    )
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound)?;

    let media = fetch_alerting_media(pool, id).await?;
    Ok(row.into_check(media))
}

pub async fn get_by_name(pool: &PgPool, name: &str) -> StoreResult<Option<Check>> {
    let row = sqlx::query_as!(
        CheckRow,
        r#"
        SELECT
            id as "id!: Id",
            name,
            enabled,
            condition as "condition!: Condition",
            failing,
            notification_count,
            initial_failure_delay_secs,
            repeat_failure_delay_secs,
            failing_since,
            last_problem_notified_at,
            most_severe as "most_severe: Condition"
        FROM checks WHERE name = $1
        "#,
        name
    )
    .fetch_optional(pool)
    .await?;

    match row {
        None => Ok(None),
        Some(row) => {
            let media = fetch_alerting_media(pool, row.id).await?;
            Ok(Some(row.into_check(media)))
        }
    }
}

/// Creates `check` if it doesn't exist yet, keyed on its unique name. Used by
/// the Check Processor's auto-creation path (spec.md §4.B).
pub async fn insert_if_absent(pool: &PgPool, check: &Check) -> StoreResult<Check> {
    if let Some(existing) = get_by_name(pool, &check.name).await? {
        return Ok(existing);
    }

    sqlx::query!(
        r#"
        INSERT INTO checks(
            id, name, enabled, condition, failing, notification_count,
            initial_failure_delay_secs, repeat_failure_delay_secs,
            failing_since, last_problem_notified_at, most_severe
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        ON CONFLICT (name) DO NOTHING
        "#,
        check.id as Id,
        check.name,
        check.enabled,
        check.condition as Condition,
        check.failing,
        check.notification_count,
        check.initial_failure_delay_secs,
        check.repeat_failure_delay_secs,
        check.failing_since,
        check.last_problem_notified_at,
        check.most_severe as Option<Condition>,
    )
    .execute(pool)
    .await?;

    get_by_name(pool, &check.name)
        .await?
        .ok_or(StoreError::NotFound)
}

pub async fn save(pool: &PgPool, check: &Check) -> StoreResult<()> {
    sqlx::query!(
        r#"
        UPDATE checks SET
            name = $2,
            enabled = $3,
            condition = $4,
            failing = $5,
            notification_count = $6,
            initial_failure_delay_secs = $7,
            repeat_failure_delay_secs = $8,
            failing_since = $9,
            last_problem_notified_at = $10,
            most_severe = $11,
            updated_at = NOW()
        WHERE id = $1
        "#,
        check.id as Id,
        check.name,
        check.enabled,
        check.condition as Condition,
        check.failing,
        check.notification_count,
        check.initial_failure_delay_secs,
        check.repeat_failure_delay_secs,
        check.failing_since,
        check.last_problem_notified_at,
        check.most_severe as Option<Condition>,
    )
    .execute(pool)
    .await?;

    sqlx::query!(
        "DELETE FROM check_alerting_media WHERE check_id = $1",
        check.id as Id
    )
    .execute(pool)
    .await?;
    for medium_id in &check.alerting_media {
        sqlx::query!(
            "INSERT INTO check_alerting_media(check_id, medium_id) VALUES ($1, $2)",
            check.id as Id,
            *medium_id as Id
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn tags(pool: &PgPool, check_id: Id) -> StoreResult<BTreeSet<String>> {
    let tags = sqlx::query!("SELECT tag FROM check_tags WHERE check_id = $1", check_id as Id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.tag)
        .collect();
    Ok(tags)
}

pub async fn set_tags(pool: &PgPool, check_id: Id, tags: &BTreeSet<String>) -> StoreResult<()> {
    sqlx::query!("DELETE FROM check_tags WHERE check_id = $1", check_id as Id)
        .execute(pool)
        .await?;
    for tag in tags {
        sqlx::query!(
            "INSERT INTO check_tags(check_id, tag) VALUES ($1, $2)",
            check_id as Id,
            tag
        )
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// FindByIndex(Check, tag, value): every check tagged with `tag`.
pub async fn find_by_tag(pool: &PgPool, tag: &str) -> StoreResult<Vec<Id>> {
    let ids = sqlx::query!(
        r#"SELECT check_id as "check_id!: Id" FROM check_tags WHERE tag = $1"#,
        tag
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| row.check_id)
    .collect();
    Ok(ids)
}

/// Reads a check's alerting-media set without taking a row lock, for
/// callers that only need it as a read-only hint before entering a
/// [`crate::with_check_lock`] transaction (re-read the locked copy before
/// acting on it).
pub async fn alerting_media(pool: &PgPool, check_id: Id) -> StoreResult<Vec<Id>> {
    fetch_alerting_media(pool, check_id).await
}

/// Fetches a check with its row locked, for callers already inside a
/// [`crate::with_check_lock`] transaction.
pub async fn get_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: Id,
) -> StoreResult<Check> {
    let row = sqlx::query_as!(
        CheckRow,
        r#"
        SELECT
            id as "id!: Id",
            name,
            enabled,
            condition as "condition!: Condition",
            failing,
            notification_count,
            initial_failure_delay_secs,
            repeat_failure_delay_secs,
            failing_since,
            last_problem_notified_at,
            most_severe as "most_severe: Condition"
        FROM checks WHERE id = $1
        FOR UPDATE
        "#,
        id as Id
    )
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(StoreError::NotFound)?;

    let media = alerting_media_in_tx(tx, id).await?;
    Ok(row.into_check(media))
}

/// Reads a check's alerting-media set with a row lock held, for callers
/// already inside a [`crate::with_check_lock`] transaction.
pub async fn alerting_media_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    check_id: Id,
) -> StoreResult<Vec<Id>> {
    let ids = sqlx::query!(
        r#"SELECT medium_id as "medium_id!: Id" FROM check_alerting_media WHERE check_id = $1"#,
        check_id as Id
    )
    .fetch_all(&mut **tx)
    .await?
    .into_iter()
    .map(|row| row.medium_id)
    .collect();
    Ok(ids)
}

pub async fn set_alerting_media_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    check_id: Id,
    media: &[Id],
) -> StoreResult<()> {
    sqlx::query!(
        "DELETE FROM check_alerting_media WHERE check_id = $1",
        check_id as Id
    )
    .execute(&mut **tx)
    .await?;
    for medium_id in media {
        sqlx::query!(
            "INSERT INTO check_alerting_media(check_id, medium_id) VALUES ($1, $2)",
            check_id as Id,
            *medium_id as Id
        )
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

pub async fn list_enabled(pool: &PgPool) -> StoreResult<Vec<Id>> {
    let ids = sqlx::query!(r#"SELECT id as "id!: Id" FROM checks WHERE enabled"#)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();
    Ok(ids)
}
