use crate::event::{normalize, EventKind};
use crate::transition;
use flapjack_maintenance::MaintenanceManager;
use flapjack_models::{Check, Id, Notification, NotificationType, State};
use flapjack_router::RouteResolver;
use flapjack_store::{checks, notifications, routes, states, Store};

/// The Check Processor (spec.md §4.B): drains the durable event queue,
/// looks up (or auto-creates) the named check, runs the failure/recovery
/// state machine, and emits a Notification when the transition warrants
/// one and no maintenance window suppresses it.
pub struct CheckProcessor {
    store: Store,
    maintenance: MaintenanceManager,
    router: RouteResolver,
}

impl CheckProcessor {
    pub fn new(store: Store, maintenance: MaintenanceManager, router: RouteResolver) -> Self {
        CheckProcessor {
            store,
            maintenance,
            router,
        }
    }

    /// Polls the inbound event queue forever, processing events in batches
    /// of `batch_size` and backing off for up to `poll_interval` (jittered)
    /// when the queue is empty.
    pub async fn run(
        &self,
        poll_interval: std::time::Duration,
        batch_size: i64,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        loop {
            if *shutdown.borrow() {
                return;
            }

            let dequeued = match flapjack_store::events::dequeue(self.store.pool(), batch_size).await {
                Ok(events) => events,
                Err(err) => {
                    tracing::error!(?err, "failed to dequeue inbound events, will retry");
                    Vec::new()
                }
            };

            if dequeued.is_empty() {
                let jitter = 0.9 + rand::random::<f64>() * 0.2;
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval.mul_f64(jitter)) => (),
                    _ = shutdown.changed() => (),
                }
                continue;
            }

            for event in dequeued {
                if let Err(err) = self.process_payload(&event.payload).await {
                    tracing::error!(?err, event_id = event.id, "failed to process inbound event");
                }
            }
        }
    }

    #[tracing::instrument(skip(self, payload))]
    pub async fn process_payload(&self, payload: &serde_json::Value) -> anyhow::Result<()> {
        let event = normalize(payload)?;
        let pool = self.store.pool();

        let mut check = checks::insert_if_absent(pool, &Check::new(event.check.clone())).await?;

        let existing_tags = checks::tags(pool, check.id).await?;
        if existing_tags.is_empty() && !event.tags.is_empty() {
            checks::set_tags(pool, check.id, &event.tags).await?;
            self.router.rematerialize(check.id).await?;
        }

        if let Some(delay) = event.initial_failure_delay {
            check.initial_failure_delay_secs = delay;
        }
        if let Some(delay) = event.repeat_failure_delay {
            check.repeat_failure_delay_secs = delay;
        }

        let condition = match event.kind {
            EventKind::Report { condition } => condition,
            EventKind::Acknowledge { duration_secs, .. } => {
                let summary = (!event.summary.is_empty()).then_some(event.summary);
                self.maintenance
                    .acknowledge(check.id, event.time, duration_secs, summary)
                    .await?;
                return Ok(());
            }
        };

        let now = event.time;
        let decision = transition::apply(&check, condition, now);

        let state = State::new(
            check.id,
            decision.condition,
            now,
            event.summary.clone(),
            event.details.clone(),
        );
        states::insert(pool, &state).await?;

        let mut updated = check;
        updated.condition = decision.condition;
        updated.failing = decision.failing;
        updated.failing_since = decision.failing_since;
        updated.last_problem_notified_at = decision.last_problem_notified_at;
        updated.most_severe = decision.most_severe;
        if decision.notify.is_some() {
            updated.notification_count += 1;
        }
        checks::save(pool, &updated).await?;

        if let Some(notification_type) = decision.notify {
            // A recovery is always delivered, even during maintenance; a
            // suppressed problem still needs its routes' `is_alerting`
            // cleared since no Notification will reach the router to do it.
            let bypass_suppression = notification_type == NotificationType::Recovery;
            let suppressed =
                !bypass_suppression && self.maintenance.is_suppressed(updated.id, now).await?;
            if suppressed {
                tracing::debug!(check_id = %updated.id, "notification suppressed by maintenance window");
                routes::clear_alerting_for_check(pool, updated.id).await?;
            } else {
                let notification = Notification {
                    id: Id::generate(),
                    check_id: updated.id,
                    state_id: state.id,
                    notification_type,
                    condition: decision.condition,
                    summary: event.summary,
                    created_at: now,
                };
                notifications::insert(pool, &notification).await?;
            }
        }

        Ok(())
    }
}
