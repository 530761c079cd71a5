use futures::stream::BoxStream;
use futures::StreamExt;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Tables clients may watch for changes.
pub const WATCHED_TABLES: [&str; 3] = ["animals", "health_alerts", "video_analyses"];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeEvent {
    Insert,
    Update,
    Delete,
}

impl ChangeEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeEvent::Insert => "insert",
            ChangeEvent::Update => "update",
            ChangeEvent::Delete => "delete",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMessage {
    pub table: String,
    pub event: ChangeEvent,
    pub id: Uuid,
}

fn channel_for(table: &str) -> String {
    format!("herdwatch:changes:{table}")
}

/// Publishes row-change notifications over Redis pub/sub so open views can
/// refetch. Delivery is fire-and-forget; a missed message only means a
/// subscriber renders stale data until the next change.
pub struct ChangeBroadcaster {
    client: redis::Client,
}

impl ChangeBroadcaster {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub async fn publish(&self, table: &str, event: ChangeEvent, id: Uuid) {
        let message = ChangeMessage {
            table: table.to_string(),
            event,
            id,
        };
        let payload = match serde_json::to_string(&message) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("failed to encode change message: {}", e);
                return;
            }
        };

        match self.client.get_multiplexed_async_connection().await {
            Ok(mut conn) => {
                let result: redis::RedisResult<()> = conn.publish(channel_for(table), payload).await;
                if let Err(e) = result {
                    tracing::warn!("failed to publish {} change: {}", table, e);
                }
            }
            Err(e) => {
                tracing::warn!("change broadcast skipped, no redis connection: {}", e);
            }
        }
    }

    /// Subscribes to one table's change channel.
    pub async fn subscribe(
        &self,
        table: &str,
    ) -> Result<BoxStream<'static, ChangeMessage>, ApiError> {
        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| ApiError::Upstream(format!("redis subscribe failed: {e}")))?;
        pubsub
            .subscribe(channel_for(table))
            .await
            .map_err(|e| ApiError::Upstream(format!("redis subscribe failed: {e}")))?;

        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move {
                let payload: String = msg.get_payload().ok()?;
                serde_json::from_str(&payload).ok()
            })
            .boxed();
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_messages_round_trip_as_json() {
        let message = ChangeMessage {
            table: "health_alerts".to_string(),
            event: ChangeEvent::Insert,
            id: Uuid::new_v4(),
        };
        let encoded = serde_json::to_string(&message).unwrap();
        assert!(encoded.contains("\"insert\""));
        let decoded: ChangeMessage = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn channels_are_scoped_per_table() {
        assert_eq!(channel_for("animals"), "herdwatch:changes:animals");
        assert_ne!(channel_for("animals"), channel_for("health_alerts"));
    }
}
