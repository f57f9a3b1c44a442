use super::{MemoryStore, PgStore};
use crate::error::Result;
use crate::models::{Event, NewEvent};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait::async_trait]
pub trait EventRepository: Send + Sync {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>>;

    /// Events dated at or after `now`, soonest first
    async fn upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>>;

    /// Events created by `user_id`, latest date first
    async fn events_by_user(&self, user_id: Uuid) -> Result<Vec<Event>>;
}

#[async_trait::async_trait]
impl EventRepository for PgStore {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (id, title, description, date, location, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new_event.title)
        .bind(&new_event.description)
        .bind(new_event.date)
        .bind(&new_event.location)
        .bind(new_event.user_id)
        .fetch_one(self.pool())
        .await?;
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(event)
    }

    async fn upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let events =
            sqlx::query_as::<_, Event>("SELECT * FROM events WHERE date >= $1 ORDER BY date ASC")
                .bind(now)
                .fetch_all(self.pool())
                .await?;
        Ok(events)
    }

    async fn events_by_user(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE user_id = $1 ORDER BY date DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;
        Ok(events)
    }
}

#[async_trait::async_trait]
impl EventRepository for MemoryStore {
    async fn create_event(&self, new_event: NewEvent) -> Result<Event> {
        let mut state = self.state.write().await;
        let now = state.now();
        let event = Event {
            id: Uuid::new_v4(),
            title: new_event.title,
            description: new_event.description,
            date: new_event.date,
            location: new_event.location,
            user_id: new_event.user_id,
            created_at: now,
        };
        state.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.state.read().await.events.get(&id).cloned())
    }

    async fn upcoming_events(&self, now: DateTime<Utc>) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.date >= now)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn events_by_user(&self, user_id: Uuid) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        let mut events: Vec<Event> = state
            .events
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(events)
    }
}
