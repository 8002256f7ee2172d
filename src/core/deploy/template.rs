use serde::{Deserialize, Serialize};

/// Which ordered step list the deployer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    /// `git checkout`, `git pull`, `make`, `make deploy`.
    #[default]
    Git,
    /// Same sequence, with the first three steps run as `prolific.user` through `su`.
    Elevated,
    /// Steps listed under `[[prolific.steps]]`.
    Custom,
}

const GIT_STEPS: &[(&str, &[&str])] = &[
    ("git", &["checkout", "{branch}"]),
    ("git", &["pull"]),
    ("make", &[]),
    ("make", &["deploy"]),
];

const ELEVATED_STEPS: &[(&str, &[&str])] = &[
    ("su", &["{user}", "-c", "git checkout {branch}"]),
    ("su", &["{user}", "-c", "git pull"]),
    ("su", &["{user}", "-c", "make"]),
    ("make", &["deploy"]),
];

/// One command of a deployment template. Arguments may carry `{owner}`,
/// `{repository}`, `{branch}` and `{user}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DeploymentStep {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Values substituted into step arguments.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub owner: &'a str,
    pub repository: &'a str,
    pub branch: &'a str,
    pub user: &'a str,
}

impl DeploymentStep {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn render_args(&self, ctx: &StepContext<'_>) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{owner}", ctx.owner)
                    .replace("{repository}", ctx.repository)
                    .replace("{branch}", ctx.branch)
                    .replace("{user}", ctx.user)
            })
            .collect()
    }
}

impl TemplateKind {
    pub fn steps(&self, custom: &[DeploymentStep]) -> Vec<DeploymentStep> {
        let builtin = match self {
            TemplateKind::Git => GIT_STEPS,
            TemplateKind::Elevated => ELEVATED_STEPS,
            TemplateKind::Custom => return custom.to_vec(),
        };
        builtin
            .iter()
            .map(|(program, args)| DeploymentStep::new(program, args))
            .collect()
    }
}
