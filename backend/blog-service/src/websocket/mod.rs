use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod message_types;
pub mod session;

pub use message_types::{WsInboundEvent, WsOutboundEvent};
pub use session::ws_handler;

/// Unique identifier for a WebSocket subscriber
///
/// A user may hold several sockets (tabs, devices); each gets its own id so
/// closing one leaves the others registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Live sockets keyed by user id
///
/// Process-local. Delivery is best effort: a push to a user with no live
/// socket is dropped and the message stays in storage for polling.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Vec<Subscriber>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a socket for `user_id`
    ///
    /// Returns the subscriber id (needed for cleanup) and the receiving end
    /// of the channel frames are pushed into.
    pub async fn add_subscriber(&self, user_id: Uuid) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let mut guard = self.inner.write().await;
        guard.entry(user_id).or_default().push(Subscriber {
            id: subscriber_id,
            sender: tx,
        });

        tracing::debug!(
            "Added subscriber {:?} for user {}, total sockets: {}",
            subscriber_id,
            user_id,
            guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
        );

        (subscriber_id, rx)
    }

    /// Remove one socket of `user_id`
    ///
    /// Must be called when a WebSocket connection closes.
    pub async fn remove_subscriber(&self, user_id: Uuid, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;

        if let Some(subscribers) = guard.get_mut(&user_id) {
            subscribers.retain(|s| s.id != subscriber_id);
            if subscribers.is_empty() {
                guard.remove(&user_id);
                tracing::debug!("User {} has no live sockets left", user_id);
            }
        }
    }

    /// Push a raw frame to every socket of `user_id`
    ///
    /// Dead senders are dropped along the way. Returns whether at least one
    /// socket accepted the frame.
    pub async fn send_to_user(&self, user_id: Uuid, frame: String) -> bool {
        let mut guard = self.inner.write().await;
        let Some(subscribers) = guard.get_mut(&user_id) else {
            return false;
        };

        subscribers.retain(|s| s.sender.send(frame.clone()).is_ok());
        let delivered = !subscribers.is_empty();
        if !delivered {
            guard.remove(&user_id);
        }
        delivered
    }

    /// Serialize and push a server event
    pub async fn send_event(&self, user_id: Uuid, event: &WsOutboundEvent) -> bool {
        match serde_json::to_string(event) {
            Ok(frame) => self.send_to_user(user_id, frame).await,
            Err(e) => {
                tracing::error!("Failed to serialize WebSocket event: {}", e);
                false
            }
        }
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.contains_key(&user_id)
    }

    /// Number of users with at least one live socket
    pub async fn online_count(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_push_reaches_every_socket_of_user() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (_a, mut rx_a) = registry.add_subscriber(user).await;
        let (_b, mut rx_b) = registry.add_subscriber(user).await;

        assert!(registry.send_to_user(user, "hello".to_string()).await);
        assert_eq!(rx_a.recv().await.as_deref(), Some("hello"));
        assert_eq!(rx_b.recv().await.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_offline_user_is_not_delivered() {
        let registry = ConnectionRegistry::new();
        assert!(!registry.send_to_user(Uuid::new_v4(), "lost".to_string()).await);
    }

    #[tokio::test]
    async fn test_remove_subscriber_cleans_up() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (id, _rx) = registry.add_subscriber(user).await;
        assert!(registry.is_online(user).await);

        registry.remove_subscriber(user, id).await;
        assert!(!registry.is_online(user).await);
        assert_eq!(registry.online_count().await, 0);
    }

    #[tokio::test]
    async fn test_dropped_receiver_is_pruned() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (_id, rx) = registry.add_subscriber(user).await;
        drop(rx);

        assert!(!registry.send_to_user(user, "gone".to_string()).await);
        assert!(!registry.is_online(user).await);
    }
}
