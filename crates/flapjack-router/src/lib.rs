//! The Route Resolver (spec.md §4.D): turns a routed Notification into zero
//! or more Alerts, one per (contact, medium) pair that wants to hear about
//! it, after applying de-duplication, rollover, and rollup.

mod materialize;
mod resolve;

pub use materialize::materialize_routes;
pub use resolve::{select_deliveries, CandidateDelivery};

use flapjack_models::{Alert, Id, Notification, NotificationType};
use flapjack_store::{alerts, checks, contacts, media, routes, rules, with_check_lock, Store, StoreResult};
use std::collections::{BTreeSet, HashMap};

#[derive(Clone)]
pub struct RouteResolver {
    store: Store,
}

impl RouteResolver {
    pub fn new(store: Store) -> Self {
        RouteResolver { store }
    }

    /// Recomputes and persists the route set for a check. Called whenever
    /// the check's tags change, a rule is added or removed, or a rule's own
    /// tags change (spec.md §4.D).
    #[tracing::instrument(skip(self))]
    pub async fn rematerialize(&self, check_id: Id) -> StoreResult<usize> {
        let tags = checks::tags(self.store.pool(), check_id).await?;
        let rules = rules::all(self.store.pool()).await?;
        let materialized = materialize_routes(check_id, &tags, &rules);
        let count = materialized.len();
        routes::replace_for_check(self.store.pool(), check_id, &materialized).await?;
        Ok(count)
    }

    /// Resolves one routed Notification into the Alerts it should produce.
    /// A recovery is handled separately (see [`Self::resolve_recovery`])
    /// since it's delivered to the check's already-alerting media
    /// regardless of which routes currently match `Condition::Ok` — a
    /// recovery is emitted even during maintenance, and routes with no
    /// explicit condition list never match a healthy condition to begin
    /// with.
    #[tracing::instrument(skip(self, notification))]
    pub async fn resolve(&self, notification: &Notification) -> StoreResult<Vec<Alert>> {
        if notification.notification_type == NotificationType::Recovery {
            return self.resolve_recovery(notification).await;
        }

        let check_id = notification.check_id;
        let check_routes = routes::for_check(self.store.pool(), check_id).await?;
        let all_rules = rules::all(self.store.pool()).await?;

        let mut tz_cache = HashMap::new();
        for rule in &all_rules {
            if tz_cache.contains_key(&rule.contact_id) {
                continue;
            }
            let contact = contacts::get(self.store.pool(), rule.contact_id).await?;
            tz_cache.insert(rule.contact_id, contact.tz());
        }

        let candidates = select_deliveries(
            notification.condition,
            notification.created_at,
            &check_routes,
            &all_rules,
            |contact_id| tz_cache.get(&contact_id).copied().unwrap_or(chrono_tz::UTC),
        );

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let mut media_cache = HashMap::new();
        for candidate in &candidates {
            if media_cache.contains_key(&candidate.medium_id) {
                continue;
            }
            let medium = media::get(self.store.pool(), candidate.medium_id).await?;
            media_cache.insert(candidate.medium_id, medium);
        }

        let notification = notification.clone();

        with_check_lock(self.store.pool(), &[check_id], move |mut tx| {
            Box::pin(async move {
                let already_alerting: BTreeSet<Id> =
                    checks::alerting_media_in_tx(&mut tx, check_id)
                        .await?
                        .into_iter()
                        .collect();

                let mut alerts = Vec::new();
                let mut now_alerting = BTreeSet::new();
                let mut alerting_routes = BTreeSet::new();

                for candidate in &candidates {
                    alerting_routes.insert(candidate.route_id);

                    if already_alerting.contains(&candidate.medium_id) {
                        now_alerting.insert(candidate.medium_id);
                        continue;
                    }

                    let medium = &media_cache[&candidate.medium_id];
                    let in_flight =
                        alerts::count_for_medium_in_tx(&mut tx, candidate.medium_id).await?;

                    let alert = if medium
                        .rollup_threshold
                        .is_some_and(|threshold| in_flight as u32 + 1 >= threshold)
                    {
                        // Over threshold: collapse this medium's whole
                        // backlog (plus this check) into a single digest
                        // alert rather than enqueuing one more individual
                        // alert alongside it. Re-issued every time the
                        // alerting set for this medium changes, since the
                        // backlog is claimed and rebuilt from scratch.
                        let claimed = alerts::claim_for_medium_in_tx(&mut tx, candidate.medium_id).await?;
                        let mut rollup_check_ids: Vec<Id> = claimed
                            .iter()
                            .flat_map(|a| a.rollup_check_ids.clone().unwrap_or_else(|| vec![a.check_id]))
                            .collect();
                        rollup_check_ids.push(check_id);
                        rollup_check_ids.sort_by_key(Id::as_uuid);
                        rollup_check_ids.dedup();

                        Alert {
                            id: Id::generate(),
                            check_id,
                            contact_id: candidate.contact_id,
                            medium_id: candidate.medium_id,
                            medium_type: medium.medium_type,
                            notification_type: notification.notification_type,
                            condition: notification.condition,
                            summary: format!(
                                "{} checks are {}",
                                rollup_check_ids.len(),
                                notification.condition
                            ),
                            details: None,
                            attempts: 0,
                            enqueued_at: notification.created_at,
                            rollup_check_ids: Some(rollup_check_ids),
                        }
                    } else {
                        Alert {
                            id: Id::generate(),
                            check_id,
                            contact_id: candidate.contact_id,
                            medium_id: candidate.medium_id,
                            medium_type: medium.medium_type,
                            notification_type: notification.notification_type,
                            condition: notification.condition,
                            summary: notification.summary.clone(),
                            details: None,
                            attempts: 0,
                            enqueued_at: notification.created_at,
                            rollup_check_ids: None,
                        }
                    };

                    alerts::insert_in_tx(&mut tx, &alert).await?;
                    alerts.push(alert);
                    now_alerting.insert(candidate.medium_id);
                }

                let new_media: Vec<Id> = now_alerting.into_iter().collect();
                checks::set_alerting_media_in_tx(&mut tx, check_id, &new_media).await?;
                routes::mark_alerting_in_tx(&mut tx, &alerting_routes.into_iter().collect::<Vec<_>>()).await?;

                tx.commit().await?;
                Ok(alerts)
            })
        })
        .await
    }

    /// Delivers a recovery to every medium the check was alerting through,
    /// then clears that alerting state entirely (spec.md §4.D, §8 scenario
    /// 2: "one recovery alert per previously alerting medium"). Bypasses
    /// route/rule condition matching since a route with no explicit
    /// condition list never matches a healthy condition — the recovery's
    /// audience is defined by who was already notified, not by routing
    /// rules re-evaluated against `Condition::Ok`.
    async fn resolve_recovery(&self, notification: &Notification) -> StoreResult<Vec<Alert>> {
        let check_id = notification.check_id;
        let pool = self.store.pool();

        let alerting_hint = checks::alerting_media(pool, check_id).await?;
        let mut media_cache = HashMap::new();
        for medium_id in &alerting_hint {
            let medium = media::get(pool, *medium_id).await?;
            media_cache.insert(*medium_id, medium);
        }

        let notification = notification.clone();

        with_check_lock(pool, &[check_id], move |mut tx| {
            Box::pin(async move {
                let alerting_now = checks::alerting_media_in_tx(&mut tx, check_id).await?;

                let mut alerts = Vec::new();
                for medium_id in &alerting_now {
                    let Some(medium) = media_cache.get(medium_id) else {
                        continue;
                    };
                    let alert = Alert {
                        id: Id::generate(),
                        check_id,
                        contact_id: medium.contact_id,
                        medium_id: *medium_id,
                        medium_type: medium.medium_type,
                        notification_type: notification.notification_type,
                        condition: notification.condition,
                        summary: notification.summary.clone(),
                        details: None,
                        attempts: 0,
                        enqueued_at: notification.created_at,
                        rollup_check_ids: None,
                    };
                    alerts::insert_in_tx(&mut tx, &alert).await?;
                    alerts.push(alert);
                }

                checks::set_alerting_media_in_tx(&mut tx, check_id, &[]).await?;
                routes::clear_alerting_for_check_in_tx(&mut tx, check_id).await?;

                tx.commit().await?;
                Ok(alerts)
            })
        })
        .await
    }
}
