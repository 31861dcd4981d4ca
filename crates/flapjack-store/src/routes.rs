use flapjack_models::{Condition, Id, Route};
use sqlx::PgPool;
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};

fn decode_conditions(raw: Option<Vec<String>>) -> StoreResult<Option<BTreeSet<Condition>>> {
    raw.map(|values| {
        values
            .into_iter()
            .map(|v| Condition::from_str(&v).map_err(|e| StoreError::Decode(e.to_string())))
            .collect::<StoreResult<BTreeSet<Condition>>>()
    })
    .transpose()
}

struct RouteRow {
    id: Id,
    check_id: Id,
    rule_id: Id,
    is_alerting: bool,
    conditions: Option<Vec<String>>,
}

impl RouteRow {
    fn into_route(self) -> StoreResult<Route> {
        Ok(Route {
            id: self.id,
            check_id: self.check_id,
            rule_id: self.rule_id,
            is_alerting: self.is_alerting,
            conditions: decode_conditions(self.conditions)?,
        })
    }
}

pub async fn for_check(pool: &PgPool, check_id: Id) -> StoreResult<Vec<Route>> {
    let rows = sqlx::query_as!(
        RouteRow,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            rule_id as "rule_id!: Id",
            is_alerting,
            conditions
        FROM routes WHERE check_id = $1
        "#,
        check_id as Id
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RouteRow::into_route).collect()
}

/// Replaces every materialized Route for `check_id` with `routes` in one
/// transaction (spec.md §4.D: routes are recomputed wholesale on any change
/// to the check's tags, the rule set, or a rule's tags).
pub async fn replace_for_check(pool: &PgPool, check_id: Id, routes: &[Route]) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query!("DELETE FROM routes WHERE check_id = $1", check_id as Id)
        .execute(&mut *tx)
        .await?;

    for route in routes {
        let conditions: Option<Vec<String>> = route
            .conditions
            .as_ref()
            .map(|set| set.iter().map(ToString::to_string).collect());

        sqlx::query!(
            r#"
            INSERT INTO routes(id, check_id, rule_id, is_alerting, conditions)
            VALUES ($1, $2, $3, $4, $5)
            "#,
            route.id as Id,
            route.check_id as Id,
            route.rule_id as Id,
            route.is_alerting,
            conditions.as_deref(),
        )
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Clears `is_alerting` on every route for `check_id` — a recovery, an
/// acknowledgement, or an early-ended maintenance window all retire the
/// routes that were carrying the previous failure's notifications.
pub async fn clear_alerting_for_check(pool: &PgPool, check_id: Id) -> StoreResult<()> {
    sqlx::query!(
        "UPDATE routes SET is_alerting = FALSE WHERE check_id = $1",
        check_id as Id
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn clear_alerting_for_check_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    check_id: Id,
) -> StoreResult<()> {
    sqlx::query!(
        "UPDATE routes SET is_alerting = FALSE WHERE check_id = $1",
        check_id as Id
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Marks the given routes as currently carrying an active delivery, so a
/// later recovery knows which routes to retire.
pub async fn mark_alerting_in_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    route_ids: &[Id],
) -> StoreResult<()> {
    if route_ids.is_empty() {
        return Ok(());
    }
    let ids: Vec<uuid::Uuid> = route_ids.iter().map(Id::as_uuid).collect();
    sqlx::query!(
        "UPDATE routes SET is_alerting = TRUE WHERE id = ANY($1)",
        &ids,
    )
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn get(pool: &PgPool, id: Id) -> StoreResult<Route> {
    let row = sqlx::query_as!(
        RouteRow,
        r#"
        SELECT
            id as "id!: Id",
            check_id as "check_id!: Id",
            rule_id as "rule_id!: Id",
            is_alerting,
            conditions
        FROM routes WHERE id = $1
        "#,
        id as Id
    )
    .fetch_optional(pool)
    .await?
    .ok_or(StoreError::NotFound)?;

    row.into_route()
}
