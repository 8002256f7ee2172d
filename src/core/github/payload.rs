use serde::{Deserialize, Serialize};

// Only the parts of the pull_request webhook the deployer reads. Missing
// fields fall back to defaults; only malformed JSON is rejected.

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadPullRequestBase {
    #[serde(default, rename = "ref")]
    pub reference: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadPullRequest {
    #[serde(default)]
    pub base: PayloadPullRequestBase,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub number: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadRepositoryOwner {
    #[serde(default)]
    pub login: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadRepository {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub owner: PayloadRepositoryOwner,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubWebHookPayload {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub pull_request: PayloadPullRequest,
    #[serde(default)]
    pub repository: PayloadRepository,
}

/// The fields of one delivery that drive a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEvent {
    pub action: String,
    pub pull_request_number: u64,
    pub merged: bool,
    pub base_branch: String,
    pub repository: String,
    pub owner: String,
}

impl From<GitHubWebHookPayload> for WebhookEvent {
    fn from(payload: GitHubWebHookPayload) -> Self {
        Self {
            action: payload.action,
            pull_request_number: payload.pull_request.number,
            merged: payload.pull_request.merged,
            base_branch: payload.pull_request.base.reference,
            repository: payload.repository.name,
            owner: payload.repository.owner.login,
        }
    }
}

impl WebhookEvent {
    /// A pull request closed by merging it.
    pub fn is_merge_close(&self) -> bool {
        self.action.eq_ignore_ascii_case("closed") && self.merged
    }

    pub fn repository_url(&self) -> String {
        format!("https://github.com/{}/{}", self.owner, self.repository)
    }
}

/// Body of `POST /repos/{owner}/{repo}/pulls/{number}/reviews`.
#[derive(Debug, Serialize)]
pub struct CreateReviewPayload<'a> {
    pub event: &'static str,
    pub body: &'a str,
}

impl<'a> CreateReviewPayload<'a> {
    /// A plain comment review: neither approves nor requests changes.
    pub fn comment(body: &'a str) -> Self {
        Self {
            event: "COMMENT",
            body,
        }
    }
}
