use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use super::super::AppState;
use super::ApiResponse;
use crate::core::audit::AuditCategory;

/// `GET /log/github`, behind `require_log_token`.
pub(crate) async fn github_logs(State(state): State<AppState>) -> Response {
    let records = state.audit.read_all(AuditCategory::GitHub).await;
    match serde_json::to_value(records) {
        Ok(data) => ApiResponse::data(data).into_response(),
        Err(e) => {
            error!("Failed to encode audit records: {}", e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            ApiResponse::error(status.as_u16(), "Failed to read logs.").with_status(status)
        }
    }
}
