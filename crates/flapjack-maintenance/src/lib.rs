//! The Maintenance Manager (spec.md §4.C): tracks scheduled and unscheduled
//! suppression windows per check and answers whether a check's alerts are
//! currently suppressed. Scheduled and unscheduled maintenance are treated
//! as independent suppressors — either one being active is enough to
//! suppress, and they don't interact (an open question in spec.md §9,
//! resolved that way).

use flapjack_models::{Alert, Id, Notification, NotificationType, ScheduledMaintenance, UnscheduledMaintenance};
use flapjack_store::{alerts, checks, maintenances, media, notifications, routes, states, with_check_lock, Store, StoreResult};
use std::collections::HashMap;

#[derive(Clone)]
pub struct MaintenanceManager {
    store: Store,
}

impl MaintenanceManager {
    pub fn new(store: Store) -> Self {
        MaintenanceManager { store }
    }

    pub async fn schedule(
        &self,
        check_id: Id,
        start_time: chrono::DateTime<chrono::Utc>,
        end_time: chrono::DateTime<chrono::Utc>,
        summary: Option<String>,
    ) -> StoreResult<ScheduledMaintenance> {
        let m = ScheduledMaintenance {
            id: Id::generate(),
            check_id,
            start_time,
            end_time,
            summary,
        };
        maintenances::schedule(self.store.pool(), &m).await?;
        Ok(m)
    }

    /// Ends a scheduled maintenance window early (spec.md §4.C): deletes it
    /// if it hadn't started yet, pulls its end in to `at` if `at` lands
    /// inside it, or no-ops if `at` is at or past its natural end. When the
    /// window is actually shortened, the check's routes are cleared so the
    /// next unhealthy sample re-notifies rather than finding stale
    /// `is_alerting` state. Returns whether anything changed.
    pub async fn end_scheduled(
        &self,
        id: Id,
        at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<bool> {
        let window = maintenances::get_scheduled(self.store.pool(), id).await?;
        with_check_lock(self.store.pool(), &[window.check_id], move |mut tx| {
            Box::pin(async move {
                let ended = maintenances::end_scheduled_in_tx(&mut tx, id, at).await?;
                if ended {
                    routes::clear_alerting_for_check_in_tx(&mut tx, window.check_id).await?;
                }
                tx.commit().await?;
                Ok(ended)
            })
        })
        .await
    }

    pub async fn in_scheduled(
        &self,
        check_id: Id,
        at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<Vec<ScheduledMaintenance>> {
        maintenances::in_scheduled(self.store.pool(), check_id, at).await
    }

    /// Opens (or extends, if already open) an indefinite unscheduled
    /// maintenance window. An operator directly silencing a check, distinct
    /// from [`Self::acknowledge`]'s bounded, failure-scoped window.
    pub async fn start_unscheduled(
        &self,
        check_id: Id,
        at: chrono::DateTime<chrono::Utc>,
        summary: Option<String>,
    ) -> StoreResult<UnscheduledMaintenance> {
        maintenances::start_unscheduled(self.store.pool(), check_id, at, summary).await
    }

    pub async fn end_unscheduled(
        &self,
        check_id: Id,
        at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<()> {
        maintenances::end_unscheduled(self.store.pool(), check_id, at).await
    }

    pub async fn current_unscheduled(
        &self,
        check_id: Id,
        at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<Option<UnscheduledMaintenance>> {
        maintenances::current_unscheduled(self.store.pool(), check_id, at).await
    }

    /// Acknowledges a failing check (spec.md §4.C): opens a bounded
    /// `[at, at+duration)` unscheduled maintenance window, clears the
    /// check's `is_alerting` routes and `alerting_media` set, and emits an
    /// acknowledgement alert to whichever media were alerting at the time.
    /// A no-op on a healthy check (`duration <= 0` is likewise a no-op,
    /// since `[at, at)` never covers any timestamp). Returns whether the
    /// acknowledgement actually took effect.
    pub async fn acknowledge(
        &self,
        check_id: Id,
        at: chrono::DateTime<chrono::Utc>,
        duration_secs: i64,
        summary: Option<String>,
    ) -> StoreResult<bool> {
        let pool = self.store.pool();

        let alerting_hint = checks::alerting_media(pool, check_id).await?;
        let mut media_cache = HashMap::new();
        for medium_id in &alerting_hint {
            let medium = media::get(pool, *medium_id).await?;
            media_cache.insert(*medium_id, medium);
        }

        let end = at + chrono::Duration::seconds(duration_secs.max(0));

        with_check_lock(pool, &[check_id], move |mut tx| {
            Box::pin(async move {
                let check = checks::get_in_tx(&mut tx, check_id).await?;
                if !check.failing {
                    tx.commit().await?;
                    return Ok(false);
                }

                maintenances::acknowledge_in_tx(&mut tx, check_id, at, end, summary.clone())
                    .await?;

                let alerting_now = checks::alerting_media_in_tx(&mut tx, check_id).await?;
                let ack_summary = summary.clone().unwrap_or_else(|| check.name.clone());
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
                        notification_type: NotificationType::Acknowledgement,
                        condition: check.condition,
                        summary: ack_summary.clone(),
                        details: None,
                        attempts: 0,
                        enqueued_at: at,
                        rollup_check_ids: None,
                    };
                    alerts::insert_in_tx(&mut tx, &alert).await?;
                }

                if let Some(state) = states::latest_in_tx(&mut tx, check_id).await? {
                    let notification = Notification {
                        id: Id::generate(),
                        check_id,
                        state_id: state.id,
                        notification_type: NotificationType::Acknowledgement,
                        condition: check.condition,
                        summary: ack_summary,
                        created_at: at,
                    };
                    notifications::insert_routed_in_tx(&mut tx, &notification).await?;
                }

                routes::clear_alerting_for_check_in_tx(&mut tx, check_id).await?;
                checks::set_alerting_media_in_tx(&mut tx, check_id, &[]).await?;

                tx.commit().await?;
                Ok(true)
            })
        })
        .await
    }

    /// Whether alerts for `check_id` should be suppressed at `at`: true if
    /// either a scheduled or an unscheduled maintenance window covers it.
    pub async fn is_suppressed(
        &self,
        check_id: Id,
        at: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<bool> {
        if self.current_unscheduled(check_id, at).await?.is_some() {
            return Ok(true);
        }
        Ok(!self.in_scheduled(check_id, at).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    // Suppression-window overlap logic, end_scheduled's three-way branch,
    // and acknowledge's alert/notification emission are all exercised
    // against a real database in flapjack-processor's and flapjack-store's
    // integration tests, where a MaintenanceManager is wired into the full
    // event-processing pipeline.
}
