mod template;

pub use template::{DeploymentStep, StepContext, TemplateKind};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::core::config::ProlificConfig;
use crate::core::process::Executable;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("root path {} does not exist", .0.display())]
    RootPathNotFound(PathBuf),

    #[error("repository path {} does not exist", .0.display())]
    RepositoryPathNotFound(PathBuf),

    #[error("dependency {0} not available")]
    DependencyMissing(String),

    #[error("{program} failed: {message}")]
    StepFailed { program: String, message: String },
}

/// What one attempted step did. `error` is empty when the step succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub args: String,
    pub work_dir: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

impl StepResult {
    pub fn failed(&self) -> bool {
        !self.error.is_empty()
    }
}

/// Steps attempted so far plus the error that stopped the run, if any.
#[derive(Debug)]
pub struct DeploymentRun {
    pub steps: Vec<StepResult>,
    pub error: Option<DeployError>,
}

impl DeploymentRun {
    fn aborted(error: DeployError) -> Self {
        warn!("Deployment finished with error (reason: {})", error);
        Self {
            steps: Vec::new(),
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Runs the configured step template inside `{root}/{branch}/{repository}`.
///
/// Runs against the same checkout are serialized; different checkouts run
/// concurrently.
pub struct Deployer {
    root_path: PathBuf,
    user: String,
    steps: Vec<DeploymentStep>,
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Deployer {
    pub fn from_config(config: &ProlificConfig) -> Self {
        Self::new(
            config.root_path.clone(),
            config.user.clone(),
            config.template.steps(&config.steps),
        )
    }

    pub fn new(root_path: PathBuf, user: String, steps: Vec<DeploymentStep>) -> Self {
        Self {
            root_path,
            user,
            steps,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn repository_path(&self, branch: &str, repository: &str) -> PathBuf {
        self.root_path.join(branch).join(repository)
    }

    /// Distinct programs the template needs, in first-use order.
    pub fn required_programs(&self) -> Vec<&str> {
        let mut programs: Vec<&str> = Vec::new();
        for step in &self.steps {
            if !programs.contains(&step.program.as_str()) {
                programs.push(&step.program);
            }
        }
        programs
    }

    /// Entries live only while a run holds or waits on them.
    async fn checkout_lock(&self, repo_path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(repo_path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_checkout_lock(&self, repo_path: &Path, lock: Arc<Mutex<()>>) {
        let mut locks = self.locks.lock().await;
        drop(lock);
        if locks
            .get(repo_path)
            .is_some_and(|l| Arc::strong_count(l) == 1)
        {
            locks.remove(repo_path);
        }
    }

    pub async fn deploy(&self, owner: &str, repository: &str, branch: &str) -> DeploymentRun {
        info!(
            "Deployment started for branch {} [{}/{}]",
            branch, owner, repository
        );

        if !path_exists(&self.root_path).await {
            return DeploymentRun::aborted(DeployError::RootPathNotFound(self.root_path.clone()));
        }
        let repo_path = self.repository_path(branch, repository);
        if !path_exists(&repo_path).await {
            return DeploymentRun::aborted(DeployError::RepositoryPathNotFound(repo_path));
        }

        let mut executables: HashMap<&str, Executable> = HashMap::new();
        for program in self.required_programs() {
            match Executable::resolve(program, Some(&repo_path)) {
                Ok(exe) if exe.exists() => {
                    executables.insert(program, exe);
                }
                _ => {
                    return DeploymentRun::aborted(DeployError::DependencyMissing(
                        program.to_string(),
                    ));
                }
            }
        }

        let lock = self.checkout_lock(&repo_path).await;
        let run = {
            let _guard = lock.lock().await;
            self.run_steps(&executables, owner, repository, branch).await
        };
        self.release_checkout_lock(&repo_path, lock).await;
        run
    }

    async fn run_steps(
        &self,
        executables: &HashMap<&str, Executable>,
        owner: &str,
        repository: &str,
        branch: &str,
    ) -> DeploymentRun {
        let ctx = StepContext {
            owner,
            repository,
            branch,
            user: &self.user,
        };
        let mut results = Vec::with_capacity(self.steps.len());

        for step in &self.steps {
            let Some(exe) = executables.get(step.program.as_str()) else {
                return DeploymentRun::aborted(DeployError::DependencyMissing(
                    step.program.clone(),
                ));
            };
            let args = step.render_args(&ctx);
            let invocation = exe.run(&args).await;

            let message = invocation
                .outcome
                .err()
                .map(|e| e.to_string())
                .unwrap_or_default();
            let mut joined = vec![exe.path.to_string_lossy().to_string()];
            joined.extend(args);

            results.push(StepResult {
                name: exe.path.to_string_lossy().to_string(),
                args: joined.join(" "),
                work_dir: exe.working_dir.to_string_lossy().to_string(),
                output: invocation.output,
                error: message.clone(),
            });

            if !message.is_empty() {
                let error = DeployError::StepFailed {
                    program: step.program.clone(),
                    message,
                };
                warn!("Deployment finished with error (reason: {})", error);
                return DeploymentRun {
                    steps: results,
                    error: Some(error),
                };
            }
        }

        info!("Deployment finished successfully");
        DeploymentRun {
            steps: results,
            error: None,
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    !path.as_os_str().is_empty() && tokio::fs::metadata(path).await.is_ok()
}
