use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::beacon::CommandAccepted;
use super::api::error::ErrorResponse;
use super::api::map::{ClickLocation, ClickRequest, MouseButton};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::beacon::status,
        super::api::beacon::path,
        super::api::beacon::flush,
        super::api::map::status,
        super::api::map::image,
        super::api::map::zoom_in,
        super::api::map::zoom_out,
        super::api::map::click,
    ),
    components(
        schemas(
            CommandAccepted,
            ClickRequest,
            ClickLocation,
            MouseButton,
            ErrorResponse,
            crate::poller::TelemetrySnapshot,
            crate::poller::PathSnapshot,
            crate::poller::MapStatus,
            crate::poller::CourseReadout,
            crate::telemetry::StationFix,
            crate::telemetry::BeaconFrame,
            crate::geodesy::Coordinate,
            crate::geodesy::Course,
            crate::map::MapView,
            crate::map::ImageSize,
            crate::map::ImagePoint,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Beacon Base API",
        description = "Telemetry and map control for a satellite beacon base station",
        version = "0.1.0"
    ),
    tags(
        (name = "beacon", description = "Beacon telemetry and message queue"),
        (name = "map", description = "Static map view and interaction")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/beacon/status",
            "/api/beacon/path",
            "/api/beacon/flush",
            "/api/map",
            "/api/map/image",
            "/api/map/zoom_in",
            "/api/map/zoom_out",
            "/api/map/click",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("api_key"));
    }
}
