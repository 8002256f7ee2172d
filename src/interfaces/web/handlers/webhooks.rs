use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use super::super::AppState;
use super::super::auth::{hub_signature, verify_hub_signature};
use super::ApiResponse;
use crate::core::github::{GitHubWebHookPayload, WebhookEvent};

const SIGNATURE_HEADER: &str = "x-hub-signature";

/// `POST /web-hook/github`
///
/// Responds before any deployment work starts; the run continues on its own task.
pub(crate) async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    else {
        let status = StatusCode::BAD_REQUEST;
        return ApiResponse::error(status.as_u16(), "No signature provided.").with_status(status);
    };

    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Failed to read webhook payload: {}", e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            return ApiResponse::error(status.as_u16(), "Failed to read payload.")
                .with_status(status);
        }
    };

    let secret = &state.config.github.webhook_secret;
    if !verify_hub_signature(&body, secret, signature) {
        debug!("Hub signature: {}", signature);
        debug!(
            "Body signature: {}",
            hub_signature(&body, secret).unwrap_or_default()
        );
        let status = StatusCode::BAD_REQUEST;
        return ApiResponse::error(status.as_u16(), "Invalid signature provided.")
            .with_status(status);
    }

    let payload: GitHubWebHookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Failed to parse webhook payload: {}", e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            return ApiResponse::error(status.as_u16(), "Failed to parse payload.")
                .with_status(status);
        }
    };
    let event = WebhookEvent::from(payload);

    // Not-watched outcomes are still 200 so GitHub does not retry the delivery.
    if let Some((kind, value)) =
        state
            .watch
            .first_unwatched(&event.owner, &event.repository, &event.base_branch)
    {
        let reason = format!("{} {} is not being watched.", kind.label(), value);
        info!("Ignoring webhook: {}", reason);
        return ApiResponse::error(kind.error_code(), reason).into_response();
    }

    if event.is_merge_close() {
        info!(
            "Dispatching deployment of PR #{} to [{}] {}/{}",
            event.pull_request_number, event.base_branch, event.owner, event.repository
        );
        // Detached: the outcome is visible only through reviews and the audit log.
        drop(state.pipeline.dispatch(event));
    } else {
        debug!(
            "Acknowledged {} event for PR #{} without deploying",
            event.action, event.pull_request_number
        );
    }

    ApiResponse::message("Event recorded.").into_response()
}
