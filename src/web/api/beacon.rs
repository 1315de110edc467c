use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::poller::{PathSnapshot, PollerCommand, TelemetrySnapshot};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

/// Returned when a command was queued for the poller.
#[derive(Debug, Serialize, ToSchema)]
pub struct CommandAccepted {
    pub command: String,
}

impl CommandAccepted {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/beacon/status",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Latest telemetry", body = TelemetrySnapshot),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "beacon"
)]
pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<TelemetrySnapshot>> {
    require_permission(&user, Permission::ViewTelemetry)?;
    Ok(Json(state.poller.snapshot()))
}

#[utoipa::path(
    get,
    path = "/api/beacon/path",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Every beacon position received this session", body = PathSnapshot),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "beacon"
)]
pub async fn path(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<PathSnapshot>> {
    require_permission(&user, Permission::ViewTelemetry)?;
    Ok(Json(PathSnapshot {
        points: state.poller.path(),
    }))
}

/// Discards the beacon's queued messages. The base answers within the beacon
/// timeout, so the request only queues the flush.
#[utoipa::path(
    post,
    path = "/api/beacon/flush",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Flush queued", body = CommandAccepted),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 503, description = "Poller not running", body = ErrorResponse)
    ),
    tag = "beacon"
)]
pub async fn flush(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    require_permission(&user, Permission::FlushQueue)?;
    state.poller.send(PollerCommand::Flush)?;
    log::info!("{} requested a queue flush", user.name);
    Ok((StatusCode::ACCEPTED, Json(CommandAccepted::new("flush"))))
}
