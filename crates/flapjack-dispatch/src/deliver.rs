use crate::render::RenderedMessage;
use flapjack_models::{Alert, Medium};

/// Disposition of one delivery attempt (spec.md §4.E).
pub enum Outcome {
    Delivered,
    /// Worth retrying with backoff (e.g. the transport timed out, the
    /// provider rate-limited us).
    Transient(anyhow::Error),
    /// Not worth retrying (e.g. the destination address is invalid).
    Permanent(anyhow::Error),
}

/// A medium-specific delivery handler. Each `MediumType` has exactly one
/// implementation, registered with the dispatcher by medium type.
#[async_trait::async_trait]
pub trait Deliver: Send + Sync {
    async fn deliver(&self, medium: &Medium, alert: &Alert, message: &RenderedMessage) -> Outcome;
}

/// A handler that logs instead of calling out to a real transport. Used for
/// mediums that don't have a configured provider, and in tests.
pub struct LoggingDeliverer;

#[async_trait::async_trait]
impl Deliver for LoggingDeliverer {
    async fn deliver(&self, medium: &Medium, alert: &Alert, message: &RenderedMessage) -> Outcome {
        tracing::info!(
            medium = %medium.address,
            medium_type = %medium.medium_type,
            check_id = %alert.check_id,
            subject = %message.subject,
            "delivering alert"
        );
        Outcome::Delivered
    }
}
