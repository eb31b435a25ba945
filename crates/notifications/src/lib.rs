//! Best-effort order notifications.
//!
//! Events published after a commit land on the [`EventBus`], which turns each
//! subscribed handler into a job on a bounded [`WorkerPool`]. Nothing here can
//! fail or slow down the transaction that produced the event:
//! - a full queue rejects the job, logs it and moves on
//! - handler errors and panics are logged and counted, never retried
//!
//! Handlers for `OrderPlaced`: purchaser confirmation email, chat summary,
//! admin alert email. Handler for `OrderStatusChanged`: status update email.

pub mod bus;
pub mod chat;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mailer;
pub mod pool;
pub mod templates;

use std::sync::Arc;

pub use bus::{EventBus, EventHandler};
pub use chat::{ChatChannel, ChatworkClient, InMemoryChat};
pub use config::{ChatworkConfig, NotificationConfig};
pub use error::{NotificationError, Result};
pub use handlers::{
    AdminEmailHandler, ChatSummaryHandler, ConfirmationEmailHandler, StatusUpdateEmailHandler,
    register_order_handlers,
};
pub use mailer::{Email, InMemoryMailer, LogMailer, Mailer};
pub use pool::{Job, WorkerPool};

/// Builds a bus with the standard order handlers from configuration.
///
/// Uses [`LogMailer`] for email and a [`ChatworkClient`] when Chatwork is
/// configured. Must be called from within a Tokio runtime.
pub fn order_notifications(config: &NotificationConfig) -> EventBus {
    let chat = config
        .chatwork
        .as_ref()
        .map(|chatwork| Arc::new(ChatworkClient::new(chatwork)) as Arc<dyn ChatChannel>);

    let mut bus = EventBus::new(WorkerPool::new(config.workers, config.queue_capacity));
    register_order_handlers(&mut bus, config, Arc::new(LogMailer), chat);
    bus
}
