//! Notification error types.

use common::OrderId;
use thiserror::Error;

/// Errors that can occur while queueing or delivering a notification.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The mail transport rejected the message.
    #[error("Mail delivery failed: {0}")]
    Mail(String),

    /// The chat endpoint could not be reached or answered with an error.
    #[error("Chat delivery failed: {0}")]
    Chat(#[from] reqwest::Error),

    /// The chat channel rejected the message.
    #[error("Chat rejected message: {0}")]
    ChatRejected(String),

    /// The order carries no purchaser email to send to.
    #[error("No recipient email for order {0}")]
    MissingRecipient(OrderId),

    /// The worker pool queue is full.
    #[error("Notification queue is full")]
    QueueFull,

    /// The worker pool is shutting down and accepts no more work.
    #[error("Notification pool is shut down")]
    ShutDown,
}

/// Convenience type alias for notification results.
pub type Result<T> = std::result::Result<T, NotificationError>;
