/// Friend service - symmetric friendships built from friend requests
use super::user_cards;
use crate::error::{AppError, Result};
use crate::models::{FriendRequest, RequestStatus, UserSummary};
use crate::repository::{FriendRepository, Store, UserRepository};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const SUGGESTION_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequestView {
    #[serde(flatten)]
    pub request: FriendRequest,
    pub sender: Option<UserSummary>,
    pub receiver: Option<UserSummary>,
}

pub struct FriendService {
    store: Arc<dyn Store>,
}

impl FriendService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn send_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        message: Option<String>,
    ) -> Result<FriendRequest> {
        if sender_id == receiver_id {
            return Err(AppError::BadRequest(
                "You cannot send a friend request to yourself".to_string(),
            ));
        }
        if self.store.find_user(receiver_id).await?.is_none() {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if self.store.are_friends(sender_id, receiver_id).await? {
            return Err(AppError::BadRequest(
                "You are already friends with this user".to_string(),
            ));
        }
        if self
            .store
            .pending_friend_request_between(sender_id, receiver_id)
            .await?
            .is_some()
        {
            return Err(request_exists());
        }

        let message = message.map(|m| m.trim().to_string()).unwrap_or_default();
        if message.chars().count() > 200 {
            return Err(AppError::BadRequest(
                "Message cannot be more than 200 characters".to_string(),
            ));
        }

        let request = self
            .store
            .create_friend_request(sender_id, receiver_id, message)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => request_exists(),
                other => other,
            })?;

        tracing::info!(request_id = %request.id, "friend request sent");
        Ok(request)
    }

    pub async fn accept(&self, request_id: Uuid, caller_id: Uuid) -> Result<FriendRequest> {
        self.check_decidable(request_id, caller_id, "accept").await?;
        let request = self
            .store
            .accept_friend_request(request_id)
            .await?
            .ok_or_else(already_processed)?;
        tracing::info!(request_id = %request.id, "friend request accepted");
        Ok(request)
    }

    pub async fn reject(&self, request_id: Uuid, caller_id: Uuid) -> Result<FriendRequest> {
        self.check_decidable(request_id, caller_id, "reject").await?;
        let request = self
            .store
            .reject_friend_request(request_id)
            .await?
            .ok_or_else(already_processed)?;
        tracing::info!(request_id = %request.id, "friend request rejected");
        Ok(request)
    }

    pub async fn received_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequestView>> {
        let requests = self.store.received_friend_requests(user_id).await?;
        self.request_views(requests).await
    }

    pub async fn sent_requests(&self, user_id: Uuid) -> Result<Vec<FriendRequestView>> {
        let requests = self.store.sent_friend_requests(user_id).await?;
        self.request_views(requests).await
    }

    pub async fn friends(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.store.friends(user_id).await
    }

    pub async fn remove(&self, user_id: Uuid, friend_id: Uuid) -> Result<()> {
        if !self.store.remove_friend(user_id, friend_id).await? {
            return Err(AppError::NotFound("Friend not found".to_string()));
        }
        tracing::info!(user_id = %user_id, friend_id = %friend_id, "friend removed");
        Ok(())
    }

    pub async fn suggestions(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.store.friend_suggestions(user_id, SUGGESTION_LIMIT).await
    }

    async fn check_decidable(&self, request_id: Uuid, caller_id: Uuid, verb: &str) -> Result<()> {
        let request = self
            .store
            .find_friend_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Friend request not found".to_string()))?;

        if request.receiver_id != caller_id {
            return Err(AppError::Forbidden(format!(
                "Not authorized to {} this request",
                verb
            )));
        }
        if request.status != RequestStatus::Pending {
            return Err(already_processed());
        }
        Ok(())
    }

    async fn request_views(&self, requests: Vec<FriendRequest>) -> Result<Vec<FriendRequestView>> {
        let cards = user_cards(
            self.store.as_ref(),
            requests.iter().flat_map(|r| [r.sender_id, r.receiver_id]),
        )
        .await?;

        Ok(requests
            .into_iter()
            .map(|request| FriendRequestView {
                sender: cards.get(&request.sender_id).cloned(),
                receiver: cards.get(&request.receiver_id).cloned(),
                request,
            })
            .collect())
    }
}

fn request_exists() -> AppError {
    AppError::BadRequest("Friend request already exists".to_string())
}

fn already_processed() -> AppError {
    AppError::BadRequest("Request has already been processed".to_string())
}
