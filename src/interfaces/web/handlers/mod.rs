pub mod logs;
pub mod webhooks;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::AppState;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApiError {
    pub code: u16,
    pub reason: String,
}

/// Envelope shared by every endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            data: None,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::ok()
        }
    }

    pub fn data(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    pub fn error(code: u16, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(ApiError {
                code,
                reason: reason.into(),
            }),
            ..Self::ok()
        }
    }

    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}

pub(crate) async fn not_found(State(state): State<AppState>) -> Response {
    if state.config.server.handle_not_found {
        let status = StatusCode::NOT_FOUND;
        ApiResponse::error(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Not Found"),
        )
        .with_status(status)
    } else {
        ApiResponse::ok().into_response()
    }
}
