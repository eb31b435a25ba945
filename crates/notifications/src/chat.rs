//! Chat room port and the Chatwork client.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::config::ChatworkConfig;
use crate::error::{NotificationError, Result};

/// Posts a message to a fixed chat room.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    async fn post(&self, message: &str) -> Result<()>;
}

/// Chatwork REST client.
///
/// Messages are sent as the form field `body` with the room token in the
/// `X-ChatWorkToken` header.
#[derive(Debug, Clone)]
pub struct ChatworkClient {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl ChatworkClient {
    pub fn new(config: &ChatworkConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: &ChatworkConfig) -> Self {
        Self {
            http,
            url: config.messages_url(),
            token: config.api_token.clone(),
        }
    }
}

#[async_trait]
impl ChatChannel for ChatworkClient {
    async fn post(&self, message: &str) -> Result<()> {
        self.http
            .post(&self.url)
            .header("X-ChatWorkToken", &self.token)
            .form(&[("body", message)])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// In-memory chat room for testing.
#[derive(Debug, Default)]
pub struct InMemoryChat {
    messages: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl InMemoryChat {
    /// Creates a new in-memory chat room.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following post fail, as an unreachable endpoint would.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Returns every message posted so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatChannel for InMemoryChat {
    async fn post(&self, message: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::ChatRejected(
                "chat endpoint unreachable".to_string(),
            ));
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
        Ok(())
    }
}
