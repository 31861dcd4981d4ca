use flapjack_models::{Condition, Id, Rule, TimeRestriction};
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

struct RuleRow {
    id: Id,
    contact_id: Id,
    conditions: Option<Vec<String>>,
    time_restriction: sqlx::types::Json<TimeRestriction>,
}

fn decode_conditions(raw: Option<Vec<String>>) -> StoreResult<Option<BTreeSet<Condition>>> {
    raw.map(|values| {
        values
            .into_iter()
            .map(|v| Condition::from_str(&v).map_err(|e| StoreError::Decode(e.to_string())))
            .collect::<StoreResult<BTreeSet<Condition>>>()
    })
    .transpose()
}

async fn assemble(pool: &PgPool, row: RuleRow) -> StoreResult<Rule> {
    let tags = sqlx::query!("SELECT tag FROM rule_tags WHERE rule_id = $1", row.id as Id)
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|r| r.tag)
        .collect();

    let media = sqlx::query!(
        r#"SELECT medium_id as "medium_id!: Id" FROM rule_media WHERE rule_id = $1"#,
        row.id as Id
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| r.medium_id)
    .collect();

    Ok(Rule {
        id: row.id,
        contact_id: row.contact_id,
        conditions: decode_conditions(row.conditions)?,
        time_restriction: row.time_restriction.0,
        tags,
        media,
    })
}

pub async fn get(pool: &PgPool, id: Id) -> StoreResult<Rule> {
    let row = sqlx::query_as!(
        RuleRow,
        r#"
        SELECT
            id as "id!: Id",
            contact_id as "contact_id!: Id",
            conditions,
            time_restriction as "time_restriction!: sqlx::types::Json<TimeRestriction>"
        FROM rules WHERE id = $1
        "#,
        id as Id
    )
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound)?;

    assemble(pool, row).await
}

pub async fn for_contact(pool: &PgPool, contact_id: Id) -> StoreResult<Vec<Rule>> {
    let rows = sqlx::query_as!(
        RuleRow,
        r#"
        SELECT
            id as "id!: Id",
            contact_id as "contact_id!: Id",
            conditions,
            time_restriction as "time_restriction!: sqlx::types::Json<TimeRestriction>"
        FROM rules WHERE contact_id = $1
        "#,
        contact_id as Id
    )
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        rules.push(assemble(pool, row).await?);
    }
    Ok(rules)
}

/// Every rule in the system, used by the Route Resolver when (re)materializing
/// routes for a check (spec.md §4.D).
pub async fn all(pool: &PgPool) -> StoreResult<Vec<Rule>> {
    let rows = sqlx::query_as!(
        RuleRow,
        r#"
        SELECT
            id as "id!: Id",
            contact_id as "contact_id!: Id",
            conditions,
            time_restriction as "time_restriction!: sqlx::types::Json<TimeRestriction>"
        FROM rules
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut rules = Vec::with_capacity(rows.len());
    for row in rows {
        rules.push(assemble(pool, row).await?);
    }
    Ok(rules)
}

pub async fn save(pool: &PgPool, rule: &Rule) -> StoreResult<()> {
    let conditions: Option<Vec<String>> = rule
        .conditions
        .as_ref()
        .map(|set| set.iter().map(ToString::to_string).collect());

    sqlx::query!(
        r#"
        INSERT INTO rules(id, contact_id, conditions, time_restriction)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (id) DO UPDATE SET
            contact_id = EXCLUDED.contact_id,
            conditions = EXCLUDED.conditions,
            time_restriction = EXCLUDED.time_restriction
        "#,
        rule.id as Id,
        rule.contact_id as Id,
        conditions.as_deref(),
        sqlx::types::Json(&rule.time_restriction) as _,
    )
    .execute(pool)
    .await?;

    sqlx::query!("DELETE FROM rule_tags WHERE rule_id = $1", rule.id as Id)
        .execute(pool)
        .await?;
    for tag in &rule.tags {
        sqlx::query!(
            "INSERT INTO rule_tags(rule_id, tag) VALUES ($1, $2)",
            rule.id as Id,
            tag
        )
        .execute(pool)
        .await?;
    }

    sqlx::query!("DELETE FROM rule_media WHERE rule_id = $1", rule.id as Id)
        .execute(pool)
        .await?;
    for medium_id in &rule.media {
        sqlx::query!(
            "INSERT INTO rule_media(rule_id, medium_id) VALUES ($1, $2)",
            rule.id as Id,
            *medium_id as Id
        )
        .execute(pool)
        .await?;
    }

    Ok(())
}
