// HTTP surface: routes, shared state and CORS.

pub mod error;
pub mod handlers;
pub mod samples;

use crate::adapters::LocalStorage;
use crate::config::Settings;
use crate::core::engine::CleaningEngine;
use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CleaningEngine<LocalStorage>>,
    pub max_upload_bytes: usize,
    pub share_row_limit: usize,
    pub cors_origins: Vec<String>,
}

impl AppState {
    pub fn new(engine: Arc<CleaningEngine<LocalStorage>>, settings: &Settings) -> Self {
        Self {
            engine,
            max_upload_bytes: settings.max_upload_bytes(),
            share_row_limit: settings.share_row_limit,
            cors_origins: settings.cors_origins.clone(),
        }
    }
}

/// `*` mirrors any origin back; otherwise only the listed origins are allowed.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS]);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(AllowOrigin::mirror_request());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim_end_matches('/')) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(origin = %o, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}

pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origins);
    let body_limit = state.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/version", get(handlers::version))
        .route("/api/clean", post(handlers::clean_invoices))
        .route("/api/stock/clean", post(handlers::clean_stock))
        .route("/api/download/{token}", get(handlers::download))
        .route("/api/sample/invoice", get(samples::invoice))
        .route("/api/sample/stock", get(samples::stock))
        .route("/share/{token}", get(handlers::share))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
