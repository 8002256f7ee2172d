pub mod comment;
mod payload;

pub use payload::{CreateReviewPayload, GitHubWebHookPayload, WebhookEvent};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::core::config::AppConfig;
use comment::BotSignature;

const REVIEW_TIMEOUT: Duration = Duration::from_secs(15);

/// Decoded JSON object returned by the GitHub API.
pub type ReviewResponse = Map<String, Value>;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("github api request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Where deployment status comments go.
#[async_trait]
pub trait ReviewSink: Send + Sync {
    /// Post `comment` on the event's pull request. `Ok(None)` means the request
    /// went through but the response body could not be decoded.
    async fn post_review(
        &self,
        event: &WebhookEvent,
        comment: &str,
    ) -> Result<Option<ReviewResponse>, ReviewError>;
}

/// Posts `COMMENT` reviews through the GitHub REST API.
pub struct GitHubReviewer {
    client: Client,
    base_url: String,
    token: String,
    signature: BotSignature,
}

impl GitHubReviewer {
    pub fn new(config: &AppConfig) -> Result<Self, ReviewError> {
        let client = Client::builder()
            .timeout(REVIEW_TIMEOUT)
            .user_agent(concat!("prolific/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.github.api_base_url.trim_end_matches('/').to_string(),
            token: config.github.personal_access_token.clone(),
            signature: BotSignature::from_config(&config.server),
        })
    }

    pub fn reviews_url(&self, event: &WebhookEvent) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}/reviews",
            self.base_url, event.owner, event.repository, event.pull_request_number
        )
    }
}

#[async_trait]
impl ReviewSink for GitHubReviewer {
    async fn post_review(
        &self,
        event: &WebhookEvent,
        comment: &str,
    ) -> Result<Option<ReviewResponse>, ReviewError> {
        let body = self.signature.wrap(comment);
        let response = self
            .client
            .post(self.reviews_url(event))
            .header("Accept", "application/vnd.github.v3+json")
            .header("Authorization", format!("Token {}", self.token))
            .json(&CreateReviewPayload::comment(&body))
            .send()
            .await?;

        info!(
            "Created GitHub review on PR #{} [{}/{}] (status {})",
            event.pull_request_number,
            event.owner,
            event.repository,
            response.status()
        );
        if !response.status().is_success() {
            warn!("GitHub rejected review: status {}", response.status());
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to read GitHub review response: {}", e);
                return Ok(None);
            }
        };
        match serde_json::from_str::<ReviewResponse>(&text) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                warn!("Failed to decode GitHub review response: {}", e);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::post,
    };
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Captured {
        path: (String, String, u64),
        accept: String,
        authorization: String,
        body: Value,
    }

    type Seen = Arc<Mutex<Vec<Captured>>>;

    async fn fake_reviews(
        Path(path): Path<(String, String, u64)>,
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        seen.lock().unwrap().push(Captured {
            path,
            accept: header("accept"),
            authorization: header("authorization"),
            body,
        });
        (
            StatusCode::OK,
            Json(serde_json::json!({ "id": 80, "state": "COMMENTED" })),
        )
    }

    async fn spawn_fake_github(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn config(base_url: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.github.api_base_url = base_url.to_string();
        config.github.personal_access_token = "pat-123".to_string();
        config.server.name = "web-01".to_string();
        config.server.url = "https://web-01.example.com".to_string();
        config
    }

    fn event() -> WebhookEvent {
        WebhookEvent {
            action: "closed".to_string(),
            pull_request_number: 42,
            merged: true,
            base_branch: "prod".to_string(),
            repository: "site".to_string(),
            owner: "acme".to_string(),
        }
    }

    #[test]
    fn reviews_url_trims_trailing_slash() {
        let reviewer = GitHubReviewer::new(&config("https://api.github.com/")).unwrap();
        assert_eq!(
            reviewer.reviews_url(&event()),
            "https://api.github.com/repos/acme/site/pulls/42/reviews"
        );
    }

    #[tokio::test]
    async fn posts_signed_comment_review() {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let router = Router::new()
            .route(
                "/repos/{owner}/{repo}/pulls/{number}/reviews",
                post(fake_reviews),
            )
            .with_state(seen.clone());
        let base = spawn_fake_github(router).await;

        let reviewer = GitHubReviewer::new(&config(&base)).unwrap();
        let response = reviewer
            .post_review(&event(), "deploying")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(response.get("state"), Some(&Value::from("COMMENTED")));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let request = &seen[0];
        assert_eq!(
            request.path,
            ("acme".to_string(), "site".to_string(), 42)
        );
        assert_eq!(request.accept, "application/vnd.github.v3+json");
        assert_eq!(request.authorization, "Token pat-123");
        assert_eq!(request.body["event"], "COMMENT");
        assert_eq!(
            request.body["body"],
            "**[Prolific Bot]**\n\ndeploying\n\nAssigned Server: [web-01](https://web-01.example.com)"
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_swallowed() {
        let router = Router::new().route(
            "/repos/{owner}/{repo}/pulls/{number}/reviews",
            post(|| async { (StatusCode::BAD_GATEWAY, "<html>upstream down</html>") }),
        );
        let base = spawn_fake_github(router).await;

        let reviewer = GitHubReviewer::new(&config(&base)).unwrap();
        let response = reviewer.post_review(&event(), "deploying").await.unwrap();
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn unreachable_api_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let reviewer = GitHubReviewer::new(&config(&format!("http://{}", addr))).unwrap();
        let err = reviewer.post_review(&event(), "deploying").await.unwrap_err();
        assert!(matches!(err, ReviewError::Transport(_)));
    }
}
