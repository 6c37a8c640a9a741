//! Route configuration and setup

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::setup::storage::local_mount_path;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, patch, post},
    Json, Router,
};
use loandesk_core::{Config, StorageBackend};
use loandesk_infra::request_id_middleware;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router, anyhow::Error> {
    let cors = setup_cors(config);

    let mut app = api_routes()
        .merge(health_routes())
        .route("/api/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(utoipa_rapidoc::RapiDoc::new("/api/openapi.json").path("/docs"));

    if config.storage_backend() == StorageBackend::Local {
        if let Some(mount) = local_mount_path(config.local_storage_base_url()) {
            tracing::info!(mount = %mount, path = %config.local_storage_path(), "Serving local artifacts");
            app = app.nest_service(&mount, ServeDir::new(config.local_storage_path()));
        }
    }

    let app = app
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_request_body_bytes()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state);

    Ok(app)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin-verify/upload",
            post(handlers::upload::upload_documents),
        )
        .route(
            "/api/admin-verify/submissions",
            get(handlers::submission_get::list_submissions),
        )
        .route(
            "/api/admin-verify/submissions/{id}",
            get(handlers::submission_get::get_submission),
        )
        .route(
            "/api/admin-verify/submissions/{id}/status",
            patch(handlers::submission_status::update_submission_status),
        )
        .route(
            "/api/generate-docs/spreadsheets",
            get(handlers::spreadsheets::list_spreadsheets),
        )
        .route(
            "/api/admin/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route("/api/admin/ws", get(handlers::admin_ws::admin_ws))
}

fn health_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/live", get(handlers::health::liveness_check))
        .route("/health/ready", get(handlers::health::readiness_check))
}

fn setup_cors(config: &Config) -> CorsLayer {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PATCH,
        Method::OPTIONS,
    ];

    if config.cors_origins().iter().any(|o| o == "*") {
        if config.is_production() {
            tracing::warn!("CORS configured to allow all origins in production");
        }
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins()
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    }
}
