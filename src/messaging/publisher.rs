use crate::{
    database::db_structs::RankingSnapshot,
    messaging::{config::RabbitMqConfig, Notifier}
};
use chrono::{DateTime, Utc};
use lapin::{
    options::{BasicPublishOptions, ExchangeDeclareOptions},
    types::FieldTable,
    BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const MESSAGE_TYPE: &str = "urn:message:Notifications:RankingUpdatedMessage";

#[derive(Debug, Error)]
pub enum PublisherError {
    #[error("Failed to connect to RabbitMQ: {0}")]
    ConnectionError(#[from] lapin::Error),

    #[error("Failed to serialize message: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Publisher not initialized")]
    NotInitialized
}

/// Asks the notification service to tell every user the ranking changed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RankingUpdatedMessage {
    pub message_key: String,
    /// When the announced ranking was computed, not when it was published
    pub computed_at: DateTime<Utc>,
    pub ranked_item_count: i64
}

impl RankingUpdatedMessage {
    pub fn new(message_key: &str, snapshot: &RankingSnapshot) -> RankingUpdatedMessage {
        RankingUpdatedMessage {
            message_key: message_key.to_string(),
            computed_at: snapshot.computed_at,
            ranked_item_count: snapshot.ranked_item_count
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    message_id: String,
    message_type: Vec<String>,
    message: T,
    sent_time: DateTime<Utc>
}

/// RabbitMQ publisher for ranking notifications
pub struct RabbitMqPublisher {
    connection: Option<Arc<Connection>>,
    channel: Option<Channel>,
    exchange: String,
    routing_key: String
}

impl RabbitMqPublisher {
    pub fn new(exchange: String, routing_key: String) -> Self {
        Self {
            connection: None,
            channel: None,
            exchange,
            routing_key
        }
    }

    pub fn from_config(config: &RabbitMqConfig) -> Self {
        Self::new(config.exchange.clone(), config.routing_key.clone())
    }

    /// Creates and connects a publisher from configuration
    pub async fn connect_from_config(config: &RabbitMqConfig) -> Result<Self, PublisherError> {
        let mut publisher = Self::from_config(config);
        publisher.connect(&config.connection_url()).await?;
        Ok(publisher)
    }

    /// Connects to RabbitMQ and declares the exchange
    pub async fn connect(&mut self, rabbitmq_url: &str) -> Result<(), PublisherError> {
        let connection = Connection::connect(rabbitmq_url, ConnectionProperties::default()).await?;
        let connection = Arc::new(connection);

        let channel = connection.create_channel().await?;

        // Fanout so every notification consumer gets a copy
        channel
            .exchange_declare(
                &self.exchange,
                ExchangeKind::Fanout,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default()
            )
            .await?;

        self.connection = Some(connection);
        self.channel = Some(channel);

        info!("Connected to RabbitMQ, exchange '{}' declared", self.exchange);

        Ok(())
    }

    pub async fn publish_ranking_updated(&self, message: RankingUpdatedMessage) -> Result<(), PublisherError> {
        let channel = self.channel.as_ref().ok_or(PublisherError::NotInitialized)?;

        let message_id = Uuid::new_v4().to_string();
        let message_key = message.message_key.clone();
        let payload = serde_json::to_vec(&envelope(message_id.clone(), message))?;

        channel
            .basic_publish(
                &self.exchange,
                &self.routing_key,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default()
                    .with_content_type("application/json".into())
                    .with_message_id(message_id.into())
                    .with_timestamp(Utc::now().timestamp() as u64)
            )
            .await?;

        debug!(
            "Published '{}' to exchange '{}' with routing key '{}'",
            message_key, self.exchange, self.routing_key
        );

        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some() && self.channel.is_some()
    }

    /// Closes the connection to RabbitMQ
    pub async fn close(&mut self) -> Result<(), PublisherError> {
        if let Some(channel) = self.channel.take() {
            channel.close(200, "Normal shutdown").await?;
        }

        if let Some(connection) = self.connection.take() {
            if let Ok(conn) = Arc::try_unwrap(connection) {
                conn.close(200, "Normal shutdown").await?;
            }
        }

        info!("RabbitMQ connection closed");
        Ok(())
    }
}

impl Notifier for RabbitMqPublisher {
    async fn notify_all(&self, message_key: &str, snapshot: &RankingSnapshot) -> Result<(), PublisherError> {
        self.publish_ranking_updated(RankingUpdatedMessage::new(message_key, snapshot))
            .await
    }
}

impl Drop for RabbitMqPublisher {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("RabbitMQ publisher dropped without proper closure");
        }
    }
}

fn envelope(message_id: String, message: RankingUpdatedMessage) -> Envelope<RankingUpdatedMessage> {
    Envelope {
        message_id,
        message_type: vec![MESSAGE_TYPE.to_string()],
        message,
        sent_time: Utc::now()
    }
}
