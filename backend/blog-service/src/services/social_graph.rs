/// Social graph service - follow requests, follow edges and suggestions
use super::user_cards;
use crate::error::{AppError, Result};
use crate::models::{FollowRequest, Page, RequestStatus, UserSummary};
use crate::repository::{SocialGraphRepository, Store, UserRepository};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_REQUEST_MESSAGE: &str = "Hi! I would like to follow you.";
const PEOPLE_YOU_MAY_KNOW_LIMIT: i64 = 50;

/// Follow request with the other party's card
#[derive(Debug, Clone, Serialize)]
pub struct FollowRequestView {
    #[serde(flatten)]
    pub request: FollowRequest,
    pub follower: Option<UserSummary>,
    pub following: Option<UserSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
    pub is_following: bool,
    pub has_pending_request: bool,
}

pub struct SocialGraphService {
    store: Arc<dyn Store>,
}

impl SocialGraphService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Open a pending follow request `follower_id -> target_id`
    pub async fn send_request(
        &self,
        follower_id: Uuid,
        target_id: Uuid,
        message: Option<String>,
    ) -> Result<FollowRequest> {
        if follower_id == target_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }
        self.ensure_user_exists(target_id).await?;

        if self.store.is_following(follower_id, target_id).await? {
            return Err(AppError::BadRequest(
                "Already following this user".to_string(),
            ));
        }
        if self
            .store
            .pending_follow_request(follower_id, target_id)
            .await?
            .is_some()
        {
            return Err(already_sent());
        }

        let message = message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_REQUEST_MESSAGE.to_string());
        if message.chars().count() > 200 {
            return Err(AppError::BadRequest(
                "Message cannot be more than 200 characters".to_string(),
            ));
        }

        // Rejected requests are terminal; the pair index turns a resend into a conflict
        let request = self
            .store
            .create_follow_request(follower_id, target_id, message)
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => already_sent(),
                other => other,
            })?;

        tracing::info!(
            request_id = %request.id,
            follower_id = %follower_id,
            following_id = %target_id,
            "follow request sent"
        );
        Ok(request)
    }

    pub async fn accept(&self, request_id: Uuid, caller_id: Uuid) -> Result<FollowRequest> {
        self.check_decidable(request_id, caller_id, "accept").await?;

        // The status flip is conditional on 'pending', so a racing second
        // accept lands here with None
        let request = self
            .store
            .accept_follow_request(request_id)
            .await?
            .ok_or_else(already_processed)?;

        tracing::info!(
            request_id = %request.id,
            follower_id = %request.follower_id,
            following_id = %request.following_id,
            "follow request accepted"
        );
        Ok(request)
    }

    pub async fn reject(&self, request_id: Uuid, caller_id: Uuid) -> Result<FollowRequest> {
        self.check_decidable(request_id, caller_id, "reject").await?;

        let request = self
            .store
            .reject_follow_request(request_id)
            .await?
            .ok_or_else(already_processed)?;

        tracing::info!(request_id = %request.id, "follow request rejected");
        Ok(request)
    }

    pub async fn unfollow(&self, follower_id: Uuid, target_id: Uuid) -> Result<()> {
        if !self.store.delete_follow_edge(follower_id, target_id).await? {
            return Err(AppError::NotFound("Not following this user".to_string()));
        }
        tracing::info!(follower_id = %follower_id, following_id = %target_id, "unfollowed");
        Ok(())
    }

    /// Follow someone who already follows the caller, without a request
    pub async fn follow_back(&self, caller_id: Uuid, target_id: Uuid) -> Result<()> {
        if caller_id == target_id {
            return Err(AppError::BadRequest("You cannot follow yourself".to_string()));
        }
        self.ensure_user_exists(target_id).await?;

        if !self.store.is_following(target_id, caller_id).await? {
            return Err(AppError::BadRequest("User is not following you".to_string()));
        }
        if !self.store.create_follow_edge(caller_id, target_id).await? {
            return Err(AppError::BadRequest(
                "Already following this user".to_string(),
            ));
        }

        tracing::info!(follower_id = %caller_id, following_id = %target_id, "followed back");
        Ok(())
    }

    pub async fn received_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequestView>> {
        let requests = self.store.received_follow_requests(user_id).await?;
        self.request_views(requests).await
    }

    pub async fn sent_requests(&self, user_id: Uuid) -> Result<Vec<FollowRequestView>> {
        let requests = self.store.sent_follow_requests(user_id).await?;
        self.request_views(requests).await
    }

    pub async fn followers(&self, user_id: Uuid, page: Page) -> Result<(Vec<UserSummary>, i64)> {
        self.ensure_user_exists(user_id).await?;
        self.store.followers(user_id, Some(page)).await
    }

    pub async fn following(&self, user_id: Uuid, page: Page) -> Result<(Vec<UserSummary>, i64)> {
        self.ensure_user_exists(user_id).await?;
        self.store.following(user_id, Some(page)).await
    }

    /// Every follower of the caller, unpaginated
    pub async fn my_followers(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        let (followers, _) = self.store.followers(user_id, None).await?;
        Ok(followers)
    }

    /// Mutual follows
    pub async fn connected_users(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.store.mutual_follows(user_id).await
    }

    pub async fn status(&self, caller_id: Uuid, target_id: Uuid) -> Result<FollowStatus> {
        Ok(FollowStatus {
            is_following: self.store.is_following(caller_id, target_id).await?,
            has_pending_request: self
                .store
                .pending_follow_request(caller_id, target_id)
                .await?
                .is_some(),
        })
    }

    pub async fn people_you_may_know(&self, user_id: Uuid) -> Result<Vec<UserSummary>> {
        self.store
            .people_you_may_know(user_id, PEOPLE_YOU_MAY_KNOW_LIMIT)
            .await
    }

    async fn ensure_user_exists(&self, user_id: Uuid) -> Result<()> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("User not found".to_string())),
        }
    }

    async fn check_decidable(&self, request_id: Uuid, caller_id: Uuid, verb: &str) -> Result<()> {
        let request = self
            .store
            .find_follow_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Follow request not found".to_string()))?;

        if request.following_id != caller_id {
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

    async fn request_views(&self, requests: Vec<FollowRequest>) -> Result<Vec<FollowRequestView>> {
        let cards = user_cards(
            self.store.as_ref(),
            requests
                .iter()
                .flat_map(|r| [r.follower_id, r.following_id]),
        )
        .await?;

        Ok(requests
            .into_iter()
            .map(|request| FollowRequestView {
                follower: cards.get(&request.follower_id).cloned(),
                following: cards.get(&request.following_id).cloned(),
                request,
            })
            .collect())
    }
}

fn already_sent() -> AppError {
    AppError::BadRequest("Follow request already sent".to_string())
}

fn already_processed() -> AppError {
    AppError::BadRequest("Request has already been processed".to_string())
}
