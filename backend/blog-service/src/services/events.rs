/// Event service - community events
use super::user_cards;
use crate::error::{AppError, Result};
use crate::models::{Event, NewEvent, UserSummary};
use crate::repository::{EventRepository, Store};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub location: Option<String>,
}

/// Event with its organizer's card
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: Event,
    pub user: Option<UserSummary>,
}

pub struct EventService {
    store: Arc<dyn Store>,
}

impl EventService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Events from now on, soonest first
    pub async fn upcoming(&self) -> Result<Vec<EventView>> {
        let events = self.store.upcoming_events(Utc::now()).await?;
        self.views(events).await
    }

    pub async fn get(&self, event_id: Uuid) -> Result<EventView> {
        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
        let mut views = self.views(vec![event]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::NotFound("Event not found".to_string()))
    }

    pub async fn create(&self, user_id: Uuid, req: CreateEventRequest) -> Result<EventView> {
        let title = req.title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
        let description = req
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let (Some(title), Some(description), Some(date)) = (title, description, req.date) else {
            return Err(AppError::BadRequest(
                "title, description and date are required".to_string(),
            ));
        };

        let event = self
            .store
            .create_event(NewEvent {
                title,
                description,
                date,
                location: req.location.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                user_id,
            })
            .await?;
        tracing::info!(event_id = %event.id, user_id = %user_id, "event created");

        let mut views = self.views(vec![event]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("created event vanished".to_string()))
    }

    /// Every event the caller organized, latest date first
    pub async fn history(&self, user_id: Uuid) -> Result<Vec<Event>> {
        self.store.events_by_user(user_id).await
    }

    async fn views(&self, events: Vec<Event>) -> Result<Vec<EventView>> {
        let cards = user_cards(self.store.as_ref(), events.iter().map(|e| e.user_id)).await?;
        Ok(events
            .into_iter()
            .map(|event| EventView {
                user: cards.get(&event.user_id).cloned(),
                event,
            })
            .collect())
    }
}
