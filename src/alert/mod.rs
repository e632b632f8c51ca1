use async_trait::async_trait;

use crate::detector::spike::SpikeAlert;

pub mod telegram;

pub use telegram::TelegramNotifier;

/// Best-effort notification sink. Delivery failures are the sink's problem:
/// implementations log and swallow them so a missed notification can never
/// stop a monitoring loop.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn dispatch(&self, alert: &SpikeAlert);
}
