//! In-process publish/subscribe over the worker pool.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{DomainEvent, EventPublisher, OrderEvent};
use futures_util::FutureExt;

use crate::error::{NotificationError, Result};
use crate::pool::WorkerPool;

/// Reacts to one type of order event.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name used in logs and metrics labels.
    fn name(&self) -> &'static str;

    /// The event type this handler subscribes to.
    fn event_type(&self) -> &'static str;

    async fn handle(&self, event: &OrderEvent) -> Result<()>;
}

/// Routes published events to their handlers.
///
/// Each handler invocation is a separate job on the [`WorkerPool`], so a slow
/// or failing handler never delays or prevents its siblings. Delivery is
/// at most once: rejected jobs are logged and dropped, failed ones are not
/// retried.
pub struct EventBus {
    handlers: HashMap<&'static str, Vec<Arc<dyn EventHandler>>>,
    pool: WorkerPool,
}

impl EventBus {
    pub fn new(pool: WorkerPool) -> Self {
        Self {
            handlers: HashMap::new(),
            pool,
        }
    }

    /// Registers a handler for the event type it declares.
    pub fn subscribe(&mut self, handler: Arc<dyn EventHandler>) {
        tracing::debug!(
            handler = handler.name(),
            event_type = handler.event_type(),
            "handler subscribed"
        );
        self.handlers
            .entry(handler.event_type())
            .or_default()
            .push(handler);
    }

    /// Returns how many handlers are subscribed to an event type.
    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Queues one job per subscribed handler and returns how many were accepted.
    ///
    /// Never waits for a handler to run.
    pub fn dispatch(&self, event: OrderEvent) -> usize {
        let event_type = event.event_type();
        let Some(handlers) = self.handlers.get(event_type) else {
            tracing::debug!(event_type, "no handlers subscribed");
            return 0;
        };

        let event = Arc::new(event);
        let mut accepted = 0;

        for handler in handlers {
            let job = invoke(Arc::clone(handler), Arc::clone(&event));
            match self.pool.submit(Box::pin(job)) {
                Ok(()) => accepted += 1,
                Err(e @ (NotificationError::QueueFull | NotificationError::ShutDown)) => {
                    metrics::counter!("notifications_rejected_total").increment(1);
                    tracing::warn!(
                        handler = handler.name(),
                        event_type,
                        order_id = %event.order().id,
                        error = %e,
                        "notification rejected"
                    );
                }
                Err(e) => {
                    tracing::error!(handler = handler.name(), error = %e, "notification not queued");
                }
            }
        }

        accepted
    }

    /// Stops accepting events and drains queued notifications for up to `grace`.
    pub async fn shutdown(&self, grace: Duration) {
        self.pool.shutdown(grace).await;
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, event: OrderEvent) {
        self.dispatch(event);
    }
}

/// Runs one handler, containing its errors and panics.
async fn invoke(handler: Arc<dyn EventHandler>, event: Arc<OrderEvent>) {
    let name = handler.name();
    let order_id = event.order().id;

    let outcome = AssertUnwindSafe(handler.handle(&event)).catch_unwind().await;

    match outcome {
        Ok(Ok(())) => {
            metrics::counter!("notifications_dispatched_total", "handler" => name).increment(1);
            tracing::info!(handler = name, order_id = %order_id, "notification sent");
        }
        Ok(Err(e)) => {
            metrics::counter!("notifications_failed_total", "handler" => name).increment(1);
            tracing::error!(handler = name, order_id = %order_id, error = %e, "notification failed");
        }
        Err(_) => {
            metrics::counter!("notifications_failed_total", "handler" => name).increment(1);
            tracing::error!(handler = name, order_id = %order_id, "notification handler panicked");
        }
    }
}
