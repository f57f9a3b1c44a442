/// Message service - direct messages, one-time messages and live pushes
use super::user_cards;
use crate::error::{AppError, Result};
use crate::models::{ConversationSummary, Message, OneTimeMessage, Page, UserSummary};
use crate::repository::{MessageRepository, Store, UserRepository};
use crate::websocket::{ConnectionRegistry, WsOutboundEvent};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const ONE_TIME_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Serialize)]
pub struct OneTimeMessageView {
    #[serde(flatten)]
    pub message: OneTimeMessage,
    pub sender: Option<UserSummary>,
    pub receiver: Option<UserSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OneTimeMessageStatus {
    pub can_send: bool,
    pub message_exists: bool,
}

pub struct MessageService {
    store: Arc<dyn Store>,
    registry: ConnectionRegistry,
}

impl MessageService {
    pub fn new(store: Arc<dyn Store>, registry: ConnectionRegistry) -> Self {
        Self { store, registry }
    }

    /// Persist a direct message, then push it to the receiver if online
    pub async fn send(&self, sender_id: Uuid, receiver_id: Uuid, content: &str) -> Result<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::BadRequest("Message content is required".to_string()));
        }
        self.check_receiver(sender_id, receiver_id).await?;

        let message = self
            .store
            .create_message(sender_id, receiver_id, content.to_string())
            .await?;

        let delivered = self
            .registry
            .send_event(
                receiver_id,
                &WsOutboundEvent::ReceiveMessage {
                    sender_id,
                    message: message.clone(),
                },
            )
            .await;
        tracing::debug!(message_id = %message.id, delivered, "direct message stored");

        Ok(message)
    }

    /// Latest message per peer with unread counts, newest first
    pub async fn conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        let latest = self.store.latest_messages_per_peer(user_id).await?;
        let unread = self.store.unread_counts_by_sender(user_id).await?;
        let cards = user_cards(self.store.as_ref(), latest.iter().map(|m| m.peer_of(user_id))).await?;

        Ok(latest
            .into_iter()
            .map(|message| {
                let peer = message.peer_of(user_id);
                ConversationSummary {
                    user: cards.get(&peer).cloned(),
                    unread_count: unread.get(&peer).copied().unwrap_or(0),
                    last_message: message,
                }
            })
            .collect())
    }

    pub async fn conversation(&self, user_id: Uuid, peer_id: Uuid, page: Page) -> Result<Vec<Message>> {
        self.store.conversation(user_id, peer_id, page).await
    }

    pub async fn mark_read(&self, reader_id: Uuid, peer_id: Uuid) -> Result<u64> {
        self.store.mark_conversation_read(reader_id, peer_id).await
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        self.store.unread_count(user_id).await
    }

    /// Send the single icebreaker allowed from `sender_id` to `receiver_id`
    pub async fn send_one_time(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: &str,
    ) -> Result<OneTimeMessage> {
        let message = message.trim();
        let length = message.chars().count();
        if length == 0 || length > ONE_TIME_MAX_CHARS {
            return Err(AppError::BadRequest(format!(
                "Message must be between 1 and {} characters",
                ONE_TIME_MAX_CHARS
            )));
        }
        self.check_receiver(sender_id, receiver_id).await?;

        if self
            .store
            .one_time_message_between(sender_id, receiver_id)
            .await?
            .is_some()
        {
            return Err(one_time_already_sent());
        }

        // The unique pair constraint settles concurrent sends
        let created = self
            .store
            .create_one_time_message(sender_id, receiver_id, message.to_string())
            .await?
            .ok_or_else(one_time_already_sent)?;

        self.registry
            .send_event(
                receiver_id,
                &WsOutboundEvent::OneTimeMessage {
                    sender_id,
                    message: created.clone(),
                },
            )
            .await;
        tracing::info!(message_id = %created.id, "one-time message sent");

        Ok(created)
    }

    pub async fn one_time_received(&self, user_id: Uuid) -> Result<Vec<OneTimeMessageView>> {
        let messages = self.store.received_one_time_messages(user_id).await?;
        self.one_time_views(messages).await
    }

    pub async fn one_time_sent(&self, user_id: Uuid) -> Result<Vec<OneTimeMessageView>> {
        let messages = self.store.sent_one_time_messages(user_id).await?;
        self.one_time_views(messages).await
    }

    pub async fn mark_one_time_read(&self, id: Uuid, caller_id: Uuid) -> Result<OneTimeMessage> {
        let message = self
            .store
            .find_one_time_message(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        if message.receiver_id != caller_id {
            return Err(AppError::Forbidden(
                "Not authorized to mark this message as read".to_string(),
            ));
        }

        self.store
            .mark_one_time_message_read(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))
    }

    pub async fn one_time_status(&self, caller_id: Uuid, target_id: Uuid) -> Result<OneTimeMessageStatus> {
        let exists = self
            .store
            .one_time_message_between(caller_id, target_id)
            .await?
            .is_some();
        Ok(OneTimeMessageStatus {
            can_send: !exists && caller_id != target_id,
            message_exists: exists,
        })
    }

    /// Relay a typing indicator; never persisted
    pub async fn relay_typing(&self, sender_id: Uuid, receiver_id: Uuid, typing: bool) -> bool {
        let event = if typing {
            WsOutboundEvent::UserTyping { sender_id }
        } else {
            WsOutboundEvent::UserStopTyping { sender_id }
        };
        self.registry.send_event(receiver_id, &event).await
    }

    async fn check_receiver(&self, sender_id: Uuid, receiver_id: Uuid) -> Result<()> {
        if sender_id == receiver_id {
            return Err(AppError::BadRequest(
                "You cannot send a message to yourself".to_string(),
            ));
        }
        if self.store.find_user(receiver_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn one_time_views(&self, messages: Vec<OneTimeMessage>) -> Result<Vec<OneTimeMessageView>> {
        let cards = user_cards(
            self.store.as_ref(),
            messages.iter().flat_map(|m| [m.sender_id, m.receiver_id]),
        )
        .await?;

        Ok(messages
            .into_iter()
            .map(|message| OneTimeMessageView {
                sender: cards.get(&message.sender_id).cloned(),
                receiver: cards.get(&message.receiver_id).cloned(),
                message,
            })
            .collect())
    }
}

fn one_time_already_sent() -> AppError {
    AppError::BadRequest("You have already sent a one-time message to this user".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, Role};
    use crate::repository::MemoryStore;

    async fn setup() -> (MessageService, ConnectionRegistry, Uuid, Uuid) {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let registry = ConnectionRegistry::new();
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let user = store
                .create_user(NewUser {
                    name: name.to_string(),
                    username: None,
                    email: format!("{name}@example.com"),
                    password_hash: "hash".to_string(),
                    role: Role::User,
                })
                .await
                .unwrap();
            ids.push(user.id);
        }
        (
            MessageService::new(store, registry.clone()),
            registry,
            ids[0],
            ids[1],
        )
    }

    #[tokio::test]
    async fn test_cannot_message_self() {
        let (service, _, alice, _) = setup().await;
        let err = service.send(alice, alice, "hi").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        let err = service.send_one_time(alice, alice, "hi").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_send_pushes_to_online_receiver() {
        let (service, registry, alice, bob) = setup().await;
        let (_id, mut rx) = registry.add_subscriber(bob).await;

        let message = service.send(alice, bob, "  hello  ").await.unwrap();
        assert_eq!(message.content, "hello");

        let frame: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(frame["type"], "receive_message");
        assert_eq!(frame["senderId"], alice.to_string());
        assert_eq!(frame["message"]["content"], "hello");
    }

    #[tokio::test]
    async fn test_offline_receiver_still_gets_stored_message() {
        let (service, _, alice, bob) = setup().await;
        service.send(alice, bob, "later").await.unwrap();

        assert_eq!(service.unread_count(bob).await.unwrap(), 1);
        let conversations = service.conversations(bob).await.unwrap();
        assert_eq!(conversations.len(), 1);
        assert_eq!(conversations[0].unread_count, 1);
        assert_eq!(conversations[0].user.as_ref().map(|u| u.id), Some(alice));
    }

    #[tokio::test]
    async fn test_one_time_message_once_per_pair() {
        let (service, _, alice, bob) = setup().await;

        let status = service.one_time_status(alice, bob).await.unwrap();
        assert!(status.can_send);

        let sent = service.send_one_time(alice, bob, "icebreaker").await.unwrap();
        let err = service.send_one_time(alice, bob, "again").await.unwrap_err();
        assert_eq!(err, one_time_already_sent());

        let status = service.one_time_status(alice, bob).await.unwrap();
        assert_eq!(
            status,
            OneTimeMessageStatus {
                can_send: false,
                message_exists: true
            }
        );

        // Only the receiver can mark it read
        let err = service.mark_one_time_read(sent.id, alice).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(service.mark_one_time_read(sent.id, bob).await.unwrap().is_read);
    }

    #[tokio::test]
    async fn test_one_time_length_bounds() {
        let (service, _, alice, bob) = setup().await;
        assert!(service.send_one_time(alice, bob, "   ").await.is_err());
        let long = "x".repeat(201);
        assert!(service.send_one_time(alice, bob, &long).await.is_err());
    }
}
