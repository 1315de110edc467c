use axum::{routing::get, routing::post, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::poller::PollerHandle;

use super::api::beacon as beacon_handlers;
use super::api::map as map_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;
use super::config::Config;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Beacon telemetry
        .route("/api/beacon/status", get(beacon_handlers::status))
        .route("/api/beacon/path", get(beacon_handlers::path))
        .route("/api/beacon/flush", post(beacon_handlers::flush))
        // Map view
        .route("/api/map", get(map_handlers::status))
        .route("/api/map/image", get(map_handlers::image))
        .route("/api/map/zoom_in", post(map_handlers::zoom_in))
        .route("/api/map/zoom_out", post(map_handlers::zoom_out))
        .route("/api/map/click", post(map_handlers::click))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, poller: PollerHandle) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    if config.api_keys.is_empty() {
        log::warn!("No API keys configured; every API request will be rejected");
    }

    let app = router(AppState {
        config: Arc::new(config),
        poller,
    });

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
