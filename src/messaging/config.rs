use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for RabbitMQ connection and messaging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RabbitMqConfig {
    /// RabbitMQ host address
    pub host: String,
    /// RabbitMQ username for authentication
    pub username: String,
    /// RabbitMQ password for authentication
    pub password: String,
    /// Virtual host to use (default: "/")
    pub vhost: String,
    /// Port number (default: 5672)
    pub port: u16,
    /// Fanout exchange the notification service listens on
    pub exchange: String,
    /// Routing key for ranking updated messages
    pub routing_key: String,
    /// When false, ranking runs skip the broadcast entirely
    pub enabled: bool
}

pub const DEFAULT_EXCHANGE: &str = "notifications.ranking";
pub const DEFAULT_ROUTING_KEY: &str = "ranking.updated";

impl RabbitMqConfig {
    /// Creates a new RabbitMQ configuration from environment variables
    pub fn from_env() -> Result<Self, env::VarError> {
        Ok(Self {
            host: env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".to_string()),
            username: env::var("RABBITMQ_USERNAME")?,
            password: env::var("RABBITMQ_PASSWORD")?,
            vhost: env::var("RABBITMQ_VHOST").unwrap_or_else(|_| "/".to_string()),
            port: env::var("RABBITMQ_PORT")
                .unwrap_or_else(|_| "5672".to_string())
                .parse()
                .unwrap_or(5672),
            exchange: env::var("RABBITMQ_EXCHANGE").unwrap_or_else(|_| DEFAULT_EXCHANGE.to_string()),
            routing_key: env::var("RABBITMQ_ROUTING_KEY").unwrap_or_else(|_| DEFAULT_ROUTING_KEY.to_string()),
            enabled: env::var("RABBITMQ_ENABLED")
                .map(|v| !v.eq_ignore_ascii_case("false"))
                .unwrap_or(true)
        })
    }

    /// Builds the AMQP connection URL from the configuration
    pub fn connection_url(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.username,
            self.password,
            self.host,
            self.port,
            self.vhost.replace('/', "%2F")
        )
    }
}

impl Default for RabbitMqConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            username: "admin".to_string(),
            password: "admin".to_string(),
            vhost: "/".to_string(),
            port: 5672,
            exchange: DEFAULT_EXCHANGE.to_string(),
            routing_key: DEFAULT_ROUTING_KEY.to_string(),
            enabled: true
        }
    }
}
