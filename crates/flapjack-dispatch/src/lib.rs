//! The Alert Dispatcher (spec.md §4.E): per-medium worker pools that render
//! and deliver queued alerts, with exponential backoff on transient
//! failures and a hard cutoff on permanent ones.

mod deliver;
mod render;
mod retry;
mod worker;

pub use deliver::{Deliver, LoggingDeliverer, Outcome};
pub use render::{RenderedMessage, Renderer};
pub use retry::{ExponentialBackoff, Retry};
pub use worker::Dispatcher;
