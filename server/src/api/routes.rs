use std::path::Path;

use crate::api::{handlers, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// `"/api/"` -> `"/api"`, `"api"` -> `"/api"`, `"/"` or `""` -> `""`.
fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/meta", get(handlers::meta))
        .route(
            "/incidents",
            post(handlers::create_incident).get(handlers::list_incidents),
        )
        .route(
            "/incidents/:id",
            get(handlers::get_incident).patch(handlers::update_incident),
        )
        .with_state(state)
}

/// Build the main router: API routes under `api_prefix`, plus the built UI when `static_dir`
/// is set (unknown paths fall back to its `index.html` for client-side routing).
pub fn build_router(state: AppState, api_prefix: &str, static_dir: Option<&Path>) -> Router {
    let prefix = normalize_prefix(api_prefix);
    let api = api_router(state);

    let mut app = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    if let Some(dir) = static_dir {
        let spa = ServeDir::new(dir).not_found_service(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new())
            .on_response(DefaultOnResponse::new()),
    )
    .layer(CorsLayer::permissive())
}
