use crate::models::{Message, OneTimeMessage};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Inbound WebSocket events from client to server
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum WsInboundEvent {
    /// Announce the socket owner; accepted only for the authenticated user
    #[serde(rename = "join", rename_all = "camelCase")]
    Join { user_id: Uuid },

    /// Persists and relays a direct message; an alternative to
    /// `POST /api/messages/send`, not a follow-up to it
    #[serde(rename = "send_message", rename_all = "camelCase")]
    SendMessage {
        receiver_id: Uuid,
        #[serde(alias = "message")]
        content: String,
    },

    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { receiver_id: Uuid },

    #[serde(rename = "stop_typing", rename_all = "camelCase")]
    StopTyping { receiver_id: Uuid },
}

/// Outbound WebSocket events from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum WsOutboundEvent {
    #[serde(rename = "joined", rename_all = "camelCase")]
    Joined { user_id: Uuid },

    #[serde(rename = "receive_message", rename_all = "camelCase")]
    ReceiveMessage { sender_id: Uuid, message: Message },

    #[serde(rename = "one_time_message", rename_all = "camelCase")]
    OneTimeMessage {
        sender_id: Uuid,
        message: OneTimeMessage,
    },

    #[serde(rename = "user_typing", rename_all = "camelCase")]
    UserTyping { sender_id: Uuid },

    #[serde(rename = "user_stop_typing", rename_all = "camelCase")]
    UserStopTyping { sender_id: Uuid },

    #[serde(rename = "error")]
    Error { message: String },
}
