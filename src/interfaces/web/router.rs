use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::AppState;
use super::auth;
use super::handlers::{self, logs, webhooks};

pub(crate) fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    // GitHub authenticates with the HMAC signature, checked in the handler.
    let webhook_routes = Router::new().route("/web-hook/github", post(webhooks::github_webhook));

    let log_routes = Router::new()
        .route("/log/github", get(logs::github_logs))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_log_token,
        ));

    webhook_routes
        .merge(log_routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(security_headers))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    response
}
