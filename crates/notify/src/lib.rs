//! Push notifications
//!
//! A `Notifier` delivers a short text, optionally with an image attachment,
//! through a third-party push service. Pushover is the built-in provider.

mod pushover;

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use sync_core::{NotificationConfig, NotificationKind, NotificationService, NotifyConfig, Result};

pub use pushover::PushoverNotifier;

/// Delivery channel for notification messages
#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Send a message, optionally attaching a JPEG image
    async fn send(&self, text: &str, attachment: Option<&Path>) -> Result<()>;
}

/// Render the message body: the bracketed kind, a newline, then the text
pub fn format_message(kind: &NotificationKind, extra: &str) -> String {
    format!("[{}]\n{}", kind, extra)
}

/// Build the notifier for a validated credential set
pub fn build_notifier(
    config: &NotificationConfig,
    settings: &NotifyConfig,
) -> Result<Box<dyn Notifier>> {
    match config.service {
        NotificationService::Pushover => {
            Ok(Box::new(PushoverNotifier::from_config(config, settings)?))
        }
    }
}
