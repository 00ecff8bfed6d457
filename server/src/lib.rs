pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod price;
pub mod queries;
pub mod schema;
pub mod telemetry;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{FromRef, MatchedPath};
use axum::http::Request;
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::Span;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::db::DbPool;
use crate::media::MediaStore;

/// Application state shared across all handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub pool: Arc<DbPool>,
    pub media: Arc<MediaStore>,
}

impl AppState {
    pub fn new(pool: DbPool, config: &Config) -> Self {
        Self {
            pool: Arc::new(pool),
            media: Arc::new(MediaStore::new(
                config.media_root.clone(),
                &config.media_url,
                config.max_image_bytes,
            )),
        }
    }
}

/// Build the full application router: API routes, stored media, Swagger UI
/// and request tracing.
pub fn app(state: AppState, config: &Config) -> Router {
    let api_router = Router::new()
        .nest("/api/user", api::user::router())
        .nest("/api/recipes", api::recipes::router(config.max_image_bytes))
        .nest("/api/tags", api::tags::router())
        .nest("/api/ingredients", api::ingredients::router());

    let swagger_ui = SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api::openapi());
    let media_files = ServeDir::new(state.media.root());

    Router::new()
        .merge(api_router)
        .merge(swagger_ui)
        .nest_service(&config.media_url, media_files)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<MatchedPath>()
                        .map(MatchedPath::as_str)
                        .unwrap_or(request.uri().path());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %matched_path,
                    )
                })
                .on_request(|_request: &Request<_>, _span: &Span| {})
                .on_response(
                    |response: &axum::http::Response<_>, latency: Duration, _span: &Span| {
                        let status = response.status().as_u16();
                        if status >= 500 {
                            tracing::error!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request failed with server error"
                            );
                        } else {
                            tracing::info!(
                                status = %status,
                                latency_ms = %latency.as_millis(),
                                "request completed"
                            );
                        }
                    },
                )
                .on_failure(
                    |error: tower_http::classify::ServerErrorsFailureClass,
                     latency: Duration,
                     _span: &Span| {
                        tracing::error!(
                            error = %error,
                            latency_ms = %latency.as_millis(),
                            "request failed"
                        );
                    },
                ),
        )
}
