// Event bus - in-process topic for comment notifications
// Publishing never waits for consumers and never retries

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::infrastructure::current_time_millis;
use crate::models::events::{CommentEvent, Envelope, COMMENT_EXCHANGE};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: CommentEvent);
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Envelope>,
    exchange: String,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        info!("Event bus created on exchange {} (capacity {})", COMMENT_EXCHANGE, capacity);
        Self {
            sender,
            exchange: COMMENT_EXCHANGE.to_string(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for EventBus {
    async fn publish(&self, event: CommentEvent) {
        let envelope = Envelope {
            exchange: self.exchange.clone(),
            routing_key: event.routing_key().to_string(),
            published_at: current_time_millis(),
            payload: event,
        };
        let routing_key = envelope.routing_key.clone();

        match self.sender.send(envelope) {
            Ok(receivers) => debug!(%routing_key, receivers, "event published"),
            Err(_) => debug!(%routing_key, "no subscribers, event dropped"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::events::{CommentCreated, COMMENT_INSERT_KEY};

    fn created() -> CommentEvent {
        CommentEvent::Created(CommentCreated {
            comment_id: 1,
            post_id: 7,
            user_id: 10,
            author_id: 3,
        })
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(created()).await;

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.exchange, COMMENT_EXCHANGE);
        assert_eq!(envelope.routing_key, COMMENT_INSERT_KEY);
        assert_eq!(envelope.payload, created());
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let bus = EventBus::new(8);
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(created()).await;
    }
}
