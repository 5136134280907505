pub mod config;
pub mod publisher;

use crate::database::db_structs::RankingSnapshot;

pub use config::RabbitMqConfig;
pub use publisher::{PublisherError, RabbitMqPublisher, RankingUpdatedMessage};

/// Broadcasts a notification to every user. Delivery is owned by the consumer.
pub trait Notifier {
    /// `snapshot` is the committed run being announced
    async fn notify_all(&self, message_key: &str, snapshot: &RankingSnapshot) -> Result<(), PublisherError>;
}
