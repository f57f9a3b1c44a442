use crate::repository::UserRepository;
use crate::services::MessageService;
use crate::state::AppState;
use crate::websocket::message_types::{WsInboundEvent, WsOutboundEvent};
use crate::websocket::{ConnectionRegistry, SubscriberId};
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_middleware::AuthClaims;
use actix_web::{get, web, Error, HttpMessage, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Frame pushed from the registry to this socket
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct Push(String);

// WebSocket Actor
struct WsSession {
    user_id: Uuid,
    subscriber_id: SubscriberId,
    registry: ConnectionRegistry,
    app_state: AppState,
    hb: Instant,
}

impl WsSession {
    fn new(user_id: Uuid, subscriber_id: SubscriberId, app_state: AppState) -> Self {
        Self {
            user_id,
            subscriber_id,
            registry: app_state.registry.clone(),
            app_state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn send_event(ctx: &mut ws::WebsocketContext<Self>, event: &WsOutboundEvent) {
        match serde_json::to_string(event) {
            Ok(frame) => ctx.text(frame),
            Err(e) => tracing::error!("Failed to serialize WebSocket event: {}", e),
        }
    }

    fn send_error(ctx: &mut ws::WebsocketContext<Self>, message: impl Into<String>) {
        Self::send_event(
            ctx,
            &WsOutboundEvent::Error {
                message: message.into(),
            },
        );
    }

    fn handle_event(&mut self, evt: WsInboundEvent, ctx: &mut ws::WebsocketContext<Self>) {
        let service = MessageService::new(self.app_state.store.clone(), self.registry.clone());
        let user_id = self.user_id;

        match evt {
            WsInboundEvent::Join { user_id: claimed } => {
                if claimed != user_id {
                    tracing::warn!(user_id = %user_id, claimed = %claimed, "rejected join for another user");
                    Self::send_error(ctx, "Cannot join as another user");
                    return;
                }
                Self::send_event(ctx, &WsOutboundEvent::Joined { user_id });
            }

            WsInboundEvent::SendMessage {
                receiver_id,
                content,
            } => {
                let addr = ctx.address();
                actix::spawn(async move {
                    // Persisted first; the service pushes to the receiver
                    if let Err(e) = service.send(user_id, receiver_id, &content).await {
                        tracing::warn!(user_id = %user_id, error = %e, "socket message rejected");
                        let event = WsOutboundEvent::Error {
                            message: e.public_message(),
                        };
                        if let Ok(frame) = serde_json::to_string(&event) {
                            addr.do_send(Push(frame));
                        }
                    }
                });
            }

            WsInboundEvent::Typing { receiver_id } | WsInboundEvent::StopTyping { receiver_id }
                if receiver_id == user_id =>
            {
                tracing::debug!(user_id = %user_id, "ignoring typing indicator to self");
            }

            WsInboundEvent::Typing { receiver_id } => {
                actix::spawn(async move {
                    service.relay_typing(user_id, receiver_id, true).await;
                });
            }

            WsInboundEvent::StopTyping { receiver_id } => {
                actix::spawn(async move {
                    service.relay_typing(user_id, receiver_id, false).await;
                });
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session started");
        self.hb(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session stopped");

        // Cleanup: remove subscriber from registry
        let registry = self.registry.clone();
        let user_id = self.user_id;
        let subscriber_id = self.subscriber_id;

        actix::spawn(async move {
            registry.remove_subscriber(user_id, subscriber_id).await;
        });
    }
}

impl Handler<Push> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Push, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

// Handle WebSocket protocol messages
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match serde_json::from_str::<WsInboundEvent>(&text) {
                    Ok(evt) => self.handle_event(evt, ctx),
                    Err(e) => {
                        tracing::warn!(user_id = %self.user_id, "Failed to parse WS message: {}", e);
                        Self::send_error(ctx, "Unrecognized event");
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket close message received: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            Err(e) => {
                tracing::warn!("WebSocket protocol error: {}", e);
                ctx.stop();
            }
            _ => {}
        }
    }
}

/// Resolve the socket owner from `?token=`, middleware claims, or the
/// cookie / bearer header
fn authenticate(params: &WsParams, req: &HttpRequest) -> Option<Uuid> {
    if let Some(token) = params.token.as_deref().filter(|t| !t.is_empty()) {
        return crypto_core::jwt::get_user_id_from_token(token)
            .map_err(|e| tracing::debug!("WebSocket token rejected: {}", e))
            .ok();
    }

    if let Some(claims) = req.extensions().get::<AuthClaims>() {
        return Some(claims.user_id);
    }

    actix_middleware::extract_token(req)
        .and_then(|token| crypto_core::jwt::get_user_id_from_token(&token).ok())
}

// HTTP handler
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let Some(user_id) = authenticate(&query, &req) else {
        tracing::warn!("WebSocket connection rejected: missing or invalid token");
        return Ok(HttpResponse::Unauthorized().json(serde_json::json!({
            "success": false,
            "message": "Not authorized to access this route",
        })));
    };

    match state.store.find_user(user_id).await {
        Ok(Some(user)) if !user.is_banned => {}
        Ok(Some(_)) => {
            return Ok(HttpResponse::Forbidden().json(serde_json::json!({
                "success": false,
                "message": "Your account has been banned",
            })));
        }
        Ok(None) => {
            return Ok(HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "message": "User not found",
            })));
        }
        Err(e) => return Err(e.into()),
    }

    // Register subscriber
    let (subscriber_id, mut rx) = state.registry.add_subscriber(user_id).await;

    let session = WsSession::new(user_id, subscriber_id, state.get_ref().clone());
    let (addr, resp) = match ws::WsResponseBuilder::new(session, &req, stream).start_with_addr() {
        Ok(started) => started,
        Err(e) => {
            state.registry.remove_subscriber(user_id, subscriber_id).await;
            return Err(e);
        }
    };

    // Bridge registry frames into the actor; ends when the actor is gone
    actix::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if !addr.connected() {
                break;
            }
            addr.do_send(Push(frame));
        }
    });

    Ok(resp)
}
