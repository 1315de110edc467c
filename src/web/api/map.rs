use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geodesy::Coordinate;
use crate::poller::{MapStatus, PollerCommand};
use crate::web::api::beacon::CommandAccepted;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Re-centre the map on the clicked point.
    Left,
    /// Report the clicked point.
    Right,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClickRequest {
    pub x: i64,
    pub y: i64,
    pub button: MouseButton,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ClickLocation {
    pub coordinate: Coordinate,
    /// `lat,lon` with six decimals, ready to paste into a map search.
    pub text: String,
}

fn content_type(format: &str) -> &'static str {
    match format {
        "jpg" | "jpg-baseline" => "image/jpeg",
        "gif" => "image/gif",
        _ => "image/png",
    }
}

#[utoipa::path(
    get,
    path = "/api/map",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Current map view", body = MapStatus),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "map"
)]
pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MapStatus>> {
    require_permission(&user, Permission::ViewTelemetry)?;
    Ok(Json(state.poller.snapshot().map))
}

/// Latest rendered map, or the placeholder when the last render failed.
#[utoipa::path(
    get,
    path = "/api/map/image",
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Map image", body = Vec<u8>, content_type = "image/png"),
        (status = 204, description = "No image and no placeholder configured"),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "map"
)]
pub async fn image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Response> {
    require_permission(&user, Permission::ViewTelemetry)?;
    let rendered = state.poller.image();
    if rendered.image.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let placeholder = if rendered.placeholder { "true" } else { "false" };
    Ok((
        [
            (header::CONTENT_TYPE, content_type(&state.config.map.format)),
            (header::CACHE_CONTROL, "no-store"),
        ],
        [("x-map-placeholder", placeholder)],
        rendered.image,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/api/map/zoom_in",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Zoom change queued", body = CommandAccepted),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "map"
)]
pub async fn zoom_in(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    require_permission(&user, Permission::ControlMap)?;
    state.poller.send(PollerCommand::ZoomIn)?;
    Ok((StatusCode::ACCEPTED, Json(CommandAccepted::new("zoom_in"))))
}

#[utoipa::path(
    post,
    path = "/api/map/zoom_out",
    security(("api_key" = [])),
    responses(
        (status = 202, description = "Zoom change queued", body = CommandAccepted),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse)
    ),
    tag = "map"
)]
pub async fn zoom_out(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<impl IntoResponse> {
    require_permission(&user, Permission::ControlMap)?;
    state.poller.send(PollerCommand::ZoomOut)?;
    Ok((StatusCode::ACCEPTED, Json(CommandAccepted::new("zoom_out"))))
}

#[utoipa::path(
    post,
    path = "/api/map/click",
    request_body = ClickRequest,
    security(("api_key" = [])),
    responses(
        (status = 200, description = "Clicked coordinate (right button)", body = ClickLocation),
        (status = 202, description = "Re-centre queued (left button)", body = CommandAccepted),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 403, description = "Insufficient permissions", body = ErrorResponse),
        (status = 409, description = "Map not clickable yet", body = ErrorResponse)
    ),
    tag = "map"
)]
pub async fn click(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ClickRequest>,
) -> ApiResult<Response> {
    require_permission(&user, Permission::ControlMap)?;
    let coordinate = state.poller.locate(request.x, request.y)?;

    match request.button {
        MouseButton::Left => {
            state.poller.send(PollerCommand::Recenter {
                x: request.x,
                y: request.y,
            })?;
            Ok((StatusCode::ACCEPTED, Json(CommandAccepted::new("recenter"))).into_response())
        }
        MouseButton::Right => Ok(Json(ClickLocation {
            coordinate,
            text: coordinate.to_string(),
        })
        .into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type() {
        assert_eq!(content_type("png"), "image/png");
        assert_eq!(content_type("png32"), "image/png");
        assert_eq!(content_type("jpg"), "image/jpeg");
        assert_eq!(content_type("gif"), "image/gif");
    }

    #[test]
    fn test_click_request_shape() {
        let request: ClickRequest =
            serde_json::from_str(r#"{"x": 10, "y": 20, "button": "right"}"#).unwrap();
        assert_eq!(request.button, MouseButton::Right);
        assert_eq!((request.x, request.y), (10, 20));
    }
}
