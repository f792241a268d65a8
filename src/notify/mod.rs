//! Run-summary notification.
//!
//! The check-in run hands its rendered summary to a [`Notifier`]. Delivery is
//! best effort: failures are reported back to the caller, which only logs
//! them.

mod telegram;

pub use telegram::{TELEGRAM_API_BASE, TelegramConfig, TelegramNotifier};

use async_trait::async_trait;
use thiserror::Error;

/// Common result type returned by notifiers.
pub type NotifyResult = Result<(), NotifyError>;

/// Shared interface implemented by notification channels.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn send(&self, text: &str) -> NotifyResult;
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("not_configured")]
    NotConfigured,
    #[error("http_{status}: {body}")]
    Http { status: u16, body: String },
    #[error("transport: {0}")]
    Transport(String),
}

/// Notifier used when no channel is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn send(&self, _text: &str) -> NotifyResult {
        Err(NotifyError::NotConfigured)
    }
}
