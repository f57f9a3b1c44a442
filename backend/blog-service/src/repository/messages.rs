use super::memory::paginate;
use super::{MemoryStore, PgStore};
use crate::error::Result;
use crate::models::{Message, OneTimeMessage, Page};
use std::collections::HashMap;
use uuid::Uuid;

/// Direct messages and one-time icebreakers
#[async_trait::async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message>;

    /// Messages exchanged between `a` and `b`, oldest first
    async fn conversation(&self, a: Uuid, b: Uuid, page: Page) -> Result<Vec<Message>>;

    /// The most recent message with each peer of `user_id`, newest first
    async fn latest_messages_per_peer(&self, user_id: Uuid) -> Result<Vec<Message>>;

    /// Unread messages addressed to `user_id`, grouped by sender
    async fn unread_counts_by_sender(&self, user_id: Uuid) -> Result<HashMap<Uuid, i64>>;

    /// Mark everything `peer_id` sent to `reader_id` as read
    async fn mark_conversation_read(&self, reader_id: Uuid, peer_id: Uuid) -> Result<u64>;

    async fn unread_count(&self, user_id: Uuid) -> Result<i64>;

    /// Insert the single message allowed for `sender -> receiver`. `None` when
    /// one already exists.
    async fn create_one_time_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: String,
    ) -> Result<Option<OneTimeMessage>>;

    async fn one_time_message_between(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<OneTimeMessage>>;

    async fn find_one_time_message(&self, id: Uuid) -> Result<Option<OneTimeMessage>>;

    async fn received_one_time_messages(&self, user_id: Uuid) -> Result<Vec<OneTimeMessage>>;

    async fn sent_one_time_messages(&self, user_id: Uuid) -> Result<Vec<OneTimeMessage>>;

    async fn mark_one_time_message_read(&self, id: Uuid) -> Result<Option<OneTimeMessage>>;
}

#[async_trait::async_trait]
impl MessageRepository for PgStore {
    async fn create_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(content)
        .fetch_one(self.pool())
        .await?;
        Ok(message)
    }

    async fn conversation(&self, a: Uuid, b: Uuid, page: Page) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = $1 AND receiver_id = $2)
               OR (sender_id = $2 AND receiver_id = $1)
            ORDER BY created_at ASC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;
        Ok(messages)
    }

    async fn latest_messages_per_peer(&self, user_id: Uuid) -> Result<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM (
                SELECT DISTINCT ON (
                    CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END
                ) *
                FROM messages
                WHERE sender_id = $1 OR receiver_id = $1
                ORDER BY CASE WHEN sender_id = $1 THEN receiver_id ELSE sender_id END,
                         created_at DESC
            ) latest
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(messages)
    }

    async fn unread_counts_by_sender(&self, user_id: Uuid) -> Result<HashMap<Uuid, i64>> {
        let rows = sqlx::query_as::<_, (Uuid, i64)>(
            r#"
            SELECT sender_id, COUNT(*) FROM messages
            WHERE receiver_id = $1 AND is_read = FALSE
            GROUP BY sender_id
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(rows.into_iter().collect())
    }

    async fn mark_conversation_read(&self, reader_id: Uuid, peer_id: Uuid) -> Result<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE, read_at = NOW()
            WHERE receiver_id = $1 AND sender_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(reader_id)
        .bind(peer_id)
        .execute(self.pool())
        .await?
        .rows_affected();
        Ok(updated)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(count)
    }

    async fn create_one_time_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: String,
    ) -> Result<Option<OneTimeMessage>> {
        let created = sqlx::query_as::<_, OneTimeMessage>(
            r#"
            INSERT INTO one_time_messages (id, sender_id, receiver_id, message)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (sender_id, receiver_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(sender_id)
        .bind(receiver_id)
        .bind(message)
        .fetch_optional(self.pool())
        .await?;
        Ok(created)
    }

    async fn one_time_message_between(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<OneTimeMessage>> {
        let message = sqlx::query_as::<_, OneTimeMessage>(
            "SELECT * FROM one_time_messages WHERE sender_id = $1 AND receiver_id = $2",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(self.pool())
        .await?;
        Ok(message)
    }

    async fn find_one_time_message(&self, id: Uuid) -> Result<Option<OneTimeMessage>> {
        let message =
            sqlx::query_as::<_, OneTimeMessage>("SELECT * FROM one_time_messages WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;
        Ok(message)
    }

    async fn received_one_time_messages(&self, user_id: Uuid) -> Result<Vec<OneTimeMessage>> {
        let messages = sqlx::query_as::<_, OneTimeMessage>(
            "SELECT * FROM one_time_messages WHERE receiver_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(messages)
    }

    async fn sent_one_time_messages(&self, user_id: Uuid) -> Result<Vec<OneTimeMessage>> {
        let messages = sqlx::query_as::<_, OneTimeMessage>(
            "SELECT * FROM one_time_messages WHERE sender_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(messages)
    }

    async fn mark_one_time_message_read(&self, id: Uuid) -> Result<Option<OneTimeMessage>> {
        let message = sqlx::query_as::<_, OneTimeMessage>(
            "UPDATE one_time_messages SET is_read = TRUE WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;
        Ok(message)
    }
}

#[async_trait::async_trait]
impl MessageRepository for MemoryStore {
    async fn create_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> Result<Message> {
        let mut state = self.state.write().await;
        let now = state.now();
        let message = Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            content,
            is_read: false,
            read_at: None,
            created_at: now,
        };
        state.messages.push(message.clone());
        Ok(message)
    }

    async fn conversation(&self, a: Uuid, b: Uuid, page: Page) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        // `messages` is append-only, so insertion order is chronological
        let messages: Vec<Message> = state
            .messages
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect();
        Ok(paginate(messages, Some(page)))
    }

    async fn latest_messages_per_peer(&self, user_id: Uuid) -> Result<Vec<Message>> {
        let state = self.state.read().await;
        let mut latest: HashMap<Uuid, &Message> = HashMap::new();
        for message in state
            .messages
            .iter()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
        {
            latest.insert(message.peer_of(user_id), message);
        }
        let mut messages: Vec<Message> = latest.into_values().cloned().collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    async fn unread_counts_by_sender(&self, user_id: Uuid) -> Result<HashMap<Uuid, i64>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for message in state
            .messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
        {
            *counts.entry(message.sender_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn mark_conversation_read(&self, reader_id: Uuid, peer_id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let now = state.now();
        let mut updated = 0;
        for message in state
            .messages
            .iter_mut()
            .filter(|m| m.receiver_id == reader_id && m.sender_id == peer_id && !m.is_read)
        {
            message.is_read = true;
            message.read_at = Some(now);
            updated += 1;
        }
        Ok(updated)
    }

    async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .messages
            .iter()
            .filter(|m| m.receiver_id == user_id && !m.is_read)
            .count() as i64)
    }

    async fn create_one_time_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: String,
    ) -> Result<Option<OneTimeMessage>> {
        let mut state = self.state.write().await;
        if state
            .one_time_messages
            .iter()
            .any(|m| m.sender_id == sender_id && m.receiver_id == receiver_id)
        {
            return Ok(None);
        }

        let now = state.now();
        let created = OneTimeMessage {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            message,
            is_read: false,
            created_at: now,
        };
        state.one_time_messages.push(created.clone());
        Ok(Some(created))
    }

    async fn one_time_message_between(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<Option<OneTimeMessage>> {
        let state = self.state.read().await;
        Ok(state
            .one_time_messages
            .iter()
            .find(|m| m.sender_id == sender_id && m.receiver_id == receiver_id)
            .cloned())
    }

    async fn find_one_time_message(&self, id: Uuid) -> Result<Option<OneTimeMessage>> {
        let state = self.state.read().await;
        Ok(state.one_time_messages.iter().find(|m| m.id == id).cloned())
    }

    async fn received_one_time_messages(&self, user_id: Uuid) -> Result<Vec<OneTimeMessage>> {
        let state = self.state.read().await;
        Ok(state
            .one_time_messages
            .iter()
            .rev()
            .filter(|m| m.receiver_id == user_id)
            .cloned()
            .collect())
    }

    async fn sent_one_time_messages(&self, user_id: Uuid) -> Result<Vec<OneTimeMessage>> {
        let state = self.state.read().await;
        Ok(state
            .one_time_messages
            .iter()
            .rev()
            .filter(|m| m.sender_id == user_id)
            .cloned()
            .collect())
    }

    async fn mark_one_time_message_read(&self, id: Uuid) -> Result<Option<OneTimeMessage>> {
        let mut state = self.state.write().await;
        Ok(state
            .one_time_messages
            .iter_mut()
            .find(|m| m.id == id)
            .map(|m| {
                m.is_read = true;
                m.clone()
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_one_time_message_is_unique_per_ordered_pair() {
        let store = MemoryStore::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        assert!(store
            .create_one_time_message(alice, bob, "hello".to_string())
            .await
            .unwrap()
            .is_some());
        assert!(store
            .create_one_time_message(alice, bob, "again".to_string())
            .await
            .unwrap()
            .is_none());
        // The reverse direction is a different pair
        assert!(store
            .create_one_time_message(bob, alice, "hi back".to_string())
            .await
            .unwrap()
            .is_some());

        assert_eq!(store.received_one_time_messages(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_conversations_and_unread_counts() {
        let store = MemoryStore::new();
        let (me, alice, bob) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        store.create_message(alice, me, "a1".to_string()).await.unwrap();
        store.create_message(me, alice, "a2".to_string()).await.unwrap();
        store.create_message(bob, me, "b1".to_string()).await.unwrap();
        store.create_message(bob, me, "b2".to_string()).await.unwrap();

        let latest = store.latest_messages_per_peer(me).await.unwrap();
        let contents: Vec<&str> = latest.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["b2", "a2"]);

        let counts = store.unread_counts_by_sender(me).await.unwrap();
        assert_eq!(counts.get(&bob), Some(&2));
        assert_eq!(counts.get(&alice), Some(&1));
        assert_eq!(store.unread_count(me).await.unwrap(), 3);

        assert_eq!(store.mark_conversation_read(me, bob).await.unwrap(), 2);
        assert_eq!(store.unread_count(me).await.unwrap(), 1);

        let thread = store
            .conversation(me, alice, Page::new(1, 50))
            .await
            .unwrap();
        assert_eq!(thread[0].content, "a1");
        assert_eq!(thread[1].content, "a2");
    }
}
