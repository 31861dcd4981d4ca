use crate::deliver::{Deliver, Outcome};
use crate::render::Renderer;
use crate::retry::Retry;
use flapjack_models::MediumType;
use flapjack_store::{alerts, media, Store};
use std::collections::HashMap;
use std::sync::Arc;

/// The Alert Dispatcher (spec.md §4.E): one worker pool per medium type,
/// each independently dequeuing ready alerts, rendering them, and handing
/// them to that medium's [`Deliver`] implementation.
pub struct Dispatcher<R: Retry> {
    store: Store,
    renderer: Arc<Renderer>,
    deliverers: HashMap<MediumType, Arc<dyn Deliver>>,
    timeouts: HashMap<MediumType, std::time::Duration>,
    retry: R,
}

const DEFAULT_DELIVERY_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

impl<R: Retry + 'static> Dispatcher<R> {
    pub fn new(store: Store, renderer: Renderer, retry: R) -> Self {
        Dispatcher {
            store,
            renderer: Arc::new(renderer),
            deliverers: HashMap::new(),
            timeouts: HashMap::new(),
            retry,
        }
    }

    /// Registers the deliverer for a medium type, along with how long a
    /// single delivery attempt may run before it's treated as a transient
    /// failure (spec.md §6's `gateways.<medium>.timeout`).
    pub fn register(
        &mut self,
        medium_type: MediumType,
        deliverer: Arc<dyn Deliver>,
        timeout: std::time::Duration,
    ) {
        self.deliverers.insert(medium_type, deliverer);
        self.timeouts.insert(medium_type, timeout);
    }

    /// Runs the worker pool for one medium type until `shutdown` fires.
    /// Ready alerts are dequeued `FOR UPDATE SKIP LOCKED` and delivered with
    /// up to `concurrency` in flight at once, mirroring the permit-gated
    /// dequeue loop used for background task execution elsewhere in this
    /// codebase.
    pub async fn run_medium(
        &self,
        medium_type: MediumType,
        concurrency: usize,
        poll_interval: std::time::Duration,
        heartbeat_timeout: std::time::Duration,
        mut shutdown: tokio::sync::watch::Receiver<bool>,
    ) {
        let Some(deliverer) = self.deliverers.get(&medium_type).cloned() else {
            tracing::warn!(?medium_type, "no deliverer registered, worker pool idle");
            return;
        };
        let timeout = self
            .timeouts
            .get(&medium_type)
            .copied()
            .unwrap_or(DEFAULT_DELIVERY_TIMEOUT);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));

        loop {
            if *shutdown.borrow() {
                return;
            }

            let permits = semaphore.available_permits() as i64;
            let ready = if permits == 0 {
                Vec::new()
            } else {
                match alerts::dequeue_ready(self.store.pool(), medium_type, heartbeat_timeout, permits)
                    .await
                {
                    Ok(alerts) => alerts,
                    Err(err) => {
                        tracing::error!(?err, ?medium_type, "failed to dequeue alerts, will retry");
                        Vec::new()
                    }
                }
            };

            if ready.is_empty() {
                let jitter = 0.9 + rand::random::<f64>() * 0.2;
                tokio::select! {
                    _ = tokio::time::sleep(poll_interval.mul_f64(jitter)) => (),
                    _ = shutdown.changed() => (),
                }
                continue;
            }

            for alert in ready {
                let semaphore = semaphore.clone();
                let deliverer = deliverer.clone();
                let renderer = self.renderer.clone();
                let store = self.store.clone();
                let retry = self.retry.clone();

                tokio::spawn(async move {
                    let _permit = semaphore.acquire().await.expect("semaphore not closed");
                    deliver_one(&store, deliverer.as_ref(), &renderer, &retry, alert, timeout).await;
                });
            }
        }
    }
}

async fn deliver_one(
    store: &Store,
    deliverer: &dyn Deliver,
    renderer: &Renderer,
    retry: &impl Retry,
    alert: flapjack_models::Alert,
    timeout: std::time::Duration,
) {
    let medium = match media::get(store.pool(), alert.medium_id).await {
        Ok(medium) => medium,
        Err(err) => {
            tracing::error!(?err, alert_id = %alert.id, "failed to load medium, leaving alert queued");
            return;
        }
    };

    let message = match renderer.render(&alert) {
        Ok(message) => message,
        Err(err) => {
            tracing::error!(?err, alert_id = %alert.id, "failed to render alert, treating as permanent failure");
            let _ = alerts::delete(store.pool(), alert.id).await;
            return;
        }
    };

    let outcome = match tokio::time::timeout(timeout, deliverer.deliver(&medium, &alert, &message)).await {
        Ok(outcome) => outcome,
        Err(_) => Outcome::Transient(anyhow::anyhow!("delivery timed out after {timeout:?}")),
    };

    match outcome {
        Outcome::Delivered => {
            if let Err(err) = alerts::delete(store.pool(), alert.id).await {
                tracing::error!(?err, alert_id = %alert.id, "failed to remove delivered alert");
            }
        }
        Outcome::Permanent(err) => {
            tracing::warn!(?err, alert_id = %alert.id, "permanent delivery failure, dropping alert");
            let _ = alerts::delete(store.pool(), alert.id).await;
        }
        Outcome::Transient(err) => {
            let attempts = alert.attempts as u32 + 1;
            match retry.next_backoff(attempts) {
                Some(delay) => {
                    tracing::debug!(?err, alert_id = %alert.id, attempts, ?delay, "transient delivery failure, backing off");
                    let wake_at = chrono::Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::seconds(1));
                    if let Err(err) = alerts::reschedule(store.pool(), alert.id, wake_at).await {
                        tracing::error!(?err, alert_id = %alert.id, "failed to reschedule alert");
                    }
                }
                None => {
                    tracing::warn!(?err, alert_id = %alert.id, attempts, "exhausted retries, dropping alert");
                    let _ = alerts::delete(store.pool(), alert.id).await;
                }
            }
        }
    }
}
