/// Event handlers
use super::{created, listing, ok};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::services::events::CreateEventRequest;
use crate::services::EventService;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/events")
            .service(
                web::resource("")
                    .route(web::get().to(upcoming_events))
                    .route(web::post().to(create_event)),
            )
            .route("/me/history", web::get().to(event_history))
            .route("/{id}", web::get().to(get_event)),
    );
}

fn events(state: &AppState) -> EventService {
    EventService::new(state.store.clone())
}

/// GET /api/events
pub async fn upcoming_events(state: web::Data<AppState>) -> Result<HttpResponse> {
    Ok(listing(events(&state).upcoming().await?))
}

/// POST /api/events
pub async fn create_event(
    state: web::Data<AppState>,
    user: AuthUser,
    req: web::Json<CreateEventRequest>,
) -> Result<HttpResponse> {
    let event = events(&state).create(user.id(), req.into_inner()).await?;
    Ok(created(event))
}

/// GET /api/events/me/history
pub async fn event_history(state: web::Data<AppState>, user: AuthUser) -> Result<HttpResponse> {
    Ok(listing(events(&state).history(user.id()).await?))
}

/// GET /api/events/{id}
pub async fn get_event(
    state: web::Data<AppState>,
    event_id: web::Path<Uuid>,
) -> Result<HttpResponse> {
    Ok(ok(events(&state).get(event_id.into_inner()).await?))
}
