use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::deploy::{DeploymentStep, TemplateKind};

pub const CONFIG_ENV_VAR: &str = "PROLIFIC_CONFIG";
const CONFIG_FILE_NAME: &str = "prolific.toml";

/// Runtime configuration, loaded once at startup and shared by reference.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub prolific: ProlificConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Shared secret used to sign webhook deliveries (`X-Hub-Signature`).
    #[serde(default)]
    pub webhook_secret: String,

    /// Token the bot uses to post pull request reviews.
    #[serde(default)]
    pub personal_access_token: String,

    /// Token required by the audit log read endpoint.
    #[serde(default)]
    pub log_access_token: String,

    #[serde(default = "default_true")]
    pub hide_error_reason: bool,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

/// Semicolon-delimited allow-lists.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct WatchConfig {
    #[serde(default)]
    pub owners: String,

    #[serde(default)]
    pub repositories: String,

    #[serde(default)]
    pub branches: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProlificConfig {
    /// Checkouts live under `{root_path}/{branch}/{repository}`.
    #[serde(default)]
    pub root_path: PathBuf,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    #[serde(default)]
    pub template: TemplateKind,

    /// Only read when `template = "custom"`.
    #[serde(default)]
    pub steps: Vec<DeploymentStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_name")]
    pub name: String,

    #[serde(default)]
    pub url: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub handle_not_found: bool,
}

fn default_true() -> bool {
    true
}
fn default_api_base_url() -> String {
    "https://api.github.com".to_string()
}
fn default_user() -> String {
    "root".to_string()
}
fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}
fn default_server_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_shutdown_timeout_secs() -> u64 {
    20
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            personal_access_token: String::new(),
            log_access_token: String::new(),
            hide_error_reason: true,
            api_base_url: default_api_base_url(),
        }
    }
}

impl Default for ProlificConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::new(),
            user: default_user(),
            logs_dir: default_logs_dir(),
            template: TemplateKind::default(),
            steps: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            url: String::new(),
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout_secs(),
            shutdown_timeout_secs: default_shutdown_timeout_secs(),
            handle_not_found: true,
        }
    }
}

impl AppConfig {
    /// Pick the config file: explicit flag, then `$PROLIFIC_CONFIG`, then
    /// `./prolific.toml`, then the per-user config directory.
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(path) = explicit {
            return path.to_path_buf();
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return PathBuf::from(path);
        }
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("prolific").join(CONFIG_FILE_NAME))
            .unwrap_or(local)
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Non-fatal problems worth logging at startup.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.github.webhook_secret.is_empty() {
            warnings.push("github.webhook_secret is empty".to_string());
        }
        if self.github.personal_access_token.is_empty() {
            warnings.push(
                "github.personal_access_token is empty, review comments will be rejected"
                    .to_string(),
            );
        }
        if self.github.log_access_token.is_empty() {
            warnings.push("github.log_access_token is empty, /log/github is closed".to_string());
        }
        if let Err(e) = url::Url::parse(&self.github.api_base_url) {
            warnings.push(format!(
                "github.api_base_url {:?} is not a valid URL: {}",
                self.github.api_base_url, e
            ));
        }

        for (key, raw) in [
            ("watch.owners", &self.watch.owners),
            ("watch.repositories", &self.watch.repositories),
            ("watch.branches", &self.watch.branches),
        ] {
            if raw.split(';').all(str::is_empty) {
                warnings.push(format!("{} is empty, no deployment will be accepted", key));
            }
        }

        if self.prolific.root_path.as_os_str().is_empty() {
            warnings.push("prolific.root_path is not set".to_string());
        }
        if self.prolific.template == TemplateKind::Custom && self.prolific.steps.is_empty() {
            warnings.push("prolific.template is \"custom\" but no steps are defined".to_string());
        }

        warnings
    }
}
