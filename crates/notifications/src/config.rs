//! Notification configuration loaded from environment variables.

use std::time::Duration;

/// Chatwork room the order summaries are posted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatworkConfig {
    pub api_url: String,
    pub room_id: String,
    pub api_token: String,
}

impl ChatworkConfig {
    /// Returns the endpoint messages are POSTed to.
    pub fn messages_url(&self) -> String {
        format!(
            "{}/rooms/{}/messages",
            self.api_url.trim_end_matches('/'),
            self.room_id
        )
    }
}

/// Notification settings.
///
/// Reads from environment variables:
/// - `MAIL_FROM` — sender address (default: `"noreply@foodanddrink.com"`)
/// - `ADMIN_EMAIL` — new-order alert recipient (default: `"admin@foodanddrink.com"`)
/// - `NOTIFY_WORKERS` — worker count (default: `5`)
/// - `NOTIFY_QUEUE_CAPACITY` — queued jobs before rejection (default: `100`)
/// - `NOTIFY_SHUTDOWN_GRACE_SECS` — drain time on shutdown (default: `60`)
/// - `CHATWORK_API_URL`, `CHATWORK_ROOM_ID`, `CHATWORK_API_TOKEN` — chat is
///   enabled only when all three are set
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub mail_from: String,
    pub admin_email: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub shutdown_grace: Duration,
    pub chatwork: Option<ChatworkConfig>,
}

impl NotificationConfig {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let chatwork = match (
            non_empty_var("CHATWORK_API_URL"),
            non_empty_var("CHATWORK_ROOM_ID"),
            non_empty_var("CHATWORK_API_TOKEN"),
        ) {
            (Some(api_url), Some(room_id), Some(api_token)) => Some(ChatworkConfig {
                api_url,
                room_id,
                api_token,
            }),
            _ => None,
        };

        Self {
            mail_from: non_empty_var("MAIL_FROM").unwrap_or(defaults.mail_from),
            admin_email: non_empty_var("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            workers: parsed_var("NOTIFY_WORKERS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.workers),
            queue_capacity: parsed_var("NOTIFY_QUEUE_CAPACITY")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.queue_capacity),
            shutdown_grace: parsed_var("NOTIFY_SHUTDOWN_GRACE_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.shutdown_grace),
            chatwork,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            mail_from: "noreply@foodanddrink.com".to_string(),
            admin_email: "admin@foodanddrink.com".to_string(),
            workers: 5,
            queue_capacity: 100,
            shutdown_grace: Duration::from_secs(60),
            chatwork: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = NotificationConfig::default();
        assert_eq!(config.mail_from, "noreply@foodanddrink.com");
        assert_eq!(config.admin_email, "admin@foodanddrink.com");
        assert_eq!(config.workers, 5);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.shutdown_grace, Duration::from_secs(60));
        assert!(config.chatwork.is_none());
    }

    #[test]
    fn test_messages_url() {
        let chatwork = ChatworkConfig {
            api_url: "https://api.chatwork.com/v2/".to_string(),
            room_id: "12345".to_string(),
            api_token: "token".to_string(),
        };
        assert_eq!(
            chatwork.messages_url(),
            "https://api.chatwork.com/v2/rooms/12345/messages"
        );
    }
}
