use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::deploy::StepResult;
use crate::core::github::ReviewResponse;

/// Log file family. Each category is stored in its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuditCategory {
    GitHub,
}

impl AuditCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditCategory::GitHub => "GitHub",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.as_str())
    }
}

/// One deployment attempt, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub time_elapsed: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AuditDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditDetail {
    pub owner: String,
    pub repository: String,
    pub branch: String,
    #[serde(default)]
    pub github_api_responses: Vec<ReviewResponse>,
    #[serde(default)]
    pub executable_logs: Vec<StepResult>,
}

impl AuditDetail {
    pub fn new(owner: &str, repository: &str, branch: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repository: repository.to_string(),
            branch: branch.to_string(),
            github_api_responses: Vec::new(),
            executable_logs: Vec::new(),
        }
    }
}

/// `Mon, 02 Jan 2006 15:04:05 UTC`
pub fn format_rfc1123(at: &DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S UTC").to_string()
}

pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3?}", elapsed)
}
