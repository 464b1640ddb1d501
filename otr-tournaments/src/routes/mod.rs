pub mod admin_routes;
pub mod health;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use otr_shared::middleware::metrics_middleware;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> anyhow::Result<Router> {
    let admin_routes = Router::new()
        .route(
            "/reset-automated-checks",
            post(admin_routes::reset_automated_checks),
        )
        .route(
            "/accept-pre-verification-statuses",
            post(admin_routes::accept_pre_verification_statuses),
        )
        .route(
            "/refetch-match-data",
            post(admin_routes::refetch_match_data),
        );

    let cors = CorsLayer::new()
        .allow_origin(state.config.web_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true);

    Ok(Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .nest("/tournaments/admin", admin_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}
