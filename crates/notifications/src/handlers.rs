//! The order notification handlers.

use std::sync::Arc;

use async_trait::async_trait;
use domain::{OrderEvent, OrderSnapshot};

use crate::bus::{EventBus, EventHandler};
use crate::chat::ChatChannel;
use crate::config::NotificationConfig;
use crate::error::{NotificationError, Result};
use crate::mailer::{Email, Mailer};
use crate::templates;

fn recipient(order: &OrderSnapshot) -> Result<String> {
    order
        .user_email
        .clone()
        .ok_or(NotificationError::MissingRecipient(order.id))
}

/// Emails the purchaser a confirmation of a new order.
pub struct ConfirmationEmailHandler {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl ConfirmationEmailHandler {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }
}

#[async_trait]
impl EventHandler for ConfirmationEmailHandler {
    fn name(&self) -> &'static str {
        "confirmation_email"
    }

    fn event_type(&self) -> &'static str {
        OrderEvent::ORDER_PLACED
    }

    async fn handle(&self, event: &OrderEvent) -> Result<()> {
        let OrderEvent::OrderPlaced(data) = event else {
            return Ok(());
        };
        let (subject, body) = templates::order_confirmation(&data.order);
        self.mailer
            .send(Email {
                from: self.from.clone(),
                to: recipient(&data.order)?,
                subject,
                body,
            })
            .await
    }
}

/// Posts a new-order summary to the shop's chat room.
pub struct ChatSummaryHandler {
    chat: Arc<dyn ChatChannel>,
}

impl ChatSummaryHandler {
    pub fn new(chat: Arc<dyn ChatChannel>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl EventHandler for ChatSummaryHandler {
    fn name(&self) -> &'static str {
        "chat_summary"
    }

    fn event_type(&self) -> &'static str {
        OrderEvent::ORDER_PLACED
    }

    async fn handle(&self, event: &OrderEvent) -> Result<()> {
        let OrderEvent::OrderPlaced(data) = event else {
            return Ok(());
        };
        self.chat
            .post(&templates::chat_new_order(&data.order))
            .await
    }
}

/// Emails the shop administrator about a new order.
pub struct AdminEmailHandler {
    mailer: Arc<dyn Mailer>,
    from: String,
    admin: String,
}

impl AdminEmailHandler {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>, admin: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
            admin: admin.into(),
        }
    }
}

#[async_trait]
impl EventHandler for AdminEmailHandler {
    fn name(&self) -> &'static str {
        "admin_email"
    }

    fn event_type(&self) -> &'static str {
        OrderEvent::ORDER_PLACED
    }

    async fn handle(&self, event: &OrderEvent) -> Result<()> {
        let OrderEvent::OrderPlaced(data) = event else {
            return Ok(());
        };
        let (subject, body) = templates::admin_new_order(&data.order);
        self.mailer
            .send(Email {
                from: self.from.clone(),
                to: self.admin.clone(),
                subject,
                body,
            })
            .await
    }
}

/// Emails the purchaser when an order changes status.
pub struct StatusUpdateEmailHandler {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl StatusUpdateEmailHandler {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }
}

#[async_trait]
impl EventHandler for StatusUpdateEmailHandler {
    fn name(&self) -> &'static str {
        "status_update_email"
    }

    fn event_type(&self) -> &'static str {
        OrderEvent::ORDER_STATUS_CHANGED
    }

    async fn handle(&self, event: &OrderEvent) -> Result<()> {
        let OrderEvent::OrderStatusChanged(data) = event else {
            return Ok(());
        };
        let (subject, body) =
            templates::order_status_update(&data.order, data.old_status, data.new_status);
        self.mailer
            .send(Email {
                from: self.from.clone(),
                to: recipient(&data.order)?,
                subject,
                body,
            })
            .await
    }
}

/// Subscribes the standard order handlers to `bus`.
///
/// The chat summary is registered only when a chat channel is given.
pub fn register_order_handlers(
    bus: &mut EventBus,
    config: &NotificationConfig,
    mailer: Arc<dyn Mailer>,
    chat: Option<Arc<dyn ChatChannel>>,
) {
    bus.subscribe(Arc::new(ConfirmationEmailHandler::new(
        Arc::clone(&mailer),
        &config.mail_from,
    )));

    match chat {
        Some(chat) => bus.subscribe(Arc::new(ChatSummaryHandler::new(chat))),
        None => tracing::info!("chat channel not configured, order summaries disabled"),
    }

    bus.subscribe(Arc::new(AdminEmailHandler::new(
        Arc::clone(&mailer),
        &config.mail_from,
        &config.admin_email,
    )));
    bus.subscribe(Arc::new(StatusUpdateEmailHandler::new(
        mailer,
        &config.mail_from,
    )));
}
