use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable {name} not found in PATH: {source}")]
    Resolution {
        name: String,
        #[source]
        source: which::Error,
    },

    #[error("cannot determine working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),

    #[error("failed to start {}: {source}", .path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{status}{}", stderr_suffix(.stderr))]
    ExitStatus { status: ExitStatus, stderr: String },
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

/// Result of one process invocation. Stdout is kept even when the process fails.
#[derive(Debug)]
pub struct Invocation {
    pub output: String,
    pub outcome: Result<(), ProcessError>,
}

/// An executable resolved to an absolute path, bound to a working directory.
#[derive(Debug, Clone)]
pub struct Executable {
    pub name: String,
    pub path: PathBuf,
    pub working_dir: PathBuf,
}

impl Executable {
    /// Resolve `name` against `PATH`. Without a working directory the current
    /// directory of the process is used.
    pub fn resolve(name: &str, working_dir: Option<&Path>) -> Result<Self, ProcessError> {
        let working_dir = match working_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => std::env::current_dir().map_err(ProcessError::WorkingDirectory)?,
        };
        let path = which::which(name).map_err(|source| ProcessError::Resolution {
            name: name.to_string(),
            source,
        })?;
        Ok(Self {
            name: name.to_string(),
            path,
            working_dir,
        })
    }

    /// Still present and executable where it was resolved.
    pub fn exists(&self) -> bool {
        which::which(&self.path).is_ok()
    }

    /// Run to completion. No timeout: the calling task waits for the child to exit.
    pub async fn run(&self, args: &[String]) -> Invocation {
        debug!(
            "Running {} {:?} in {}",
            self.path.display(),
            args,
            self.working_dir.display()
        );

        let output = Command::new(&self.path)
            .args(args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(source) => {
                return Invocation {
                    output: String::new(),
                    outcome: Err(ProcessError::Spawn {
                        path: self.path.clone(),
                        source,
                    }),
                };
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let outcome = if output.status.success() {
            Ok(())
        } else {
            Err(ProcessError::ExitStatus {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        };

        Invocation {
            output: stdout,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_shell_to_absolute_path() {
        let sh = Executable::resolve("sh", None).unwrap();
        assert!(sh.path.is_absolute());
        assert!(sh.exists());
        assert_eq!(sh.working_dir, std::env::current_dir().unwrap());
    }

    #[test]
    fn unknown_executable_fails_resolution() {
        let err = Executable::resolve("prolific-definitely-not-installed", None).unwrap_err();
        assert!(matches!(err, ProcessError::Resolution { .. }));
        assert!(err.to_string().contains("prolific-definitely-not-installed"));
    }

    #[test]
    fn removed_executable_no_longer_exists() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("release.sh");
        std::fs::write(&script, "#!/bin/sh\necho released\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let exe = Executable::resolve(script.to_str().unwrap(), Some(dir.path())).unwrap();
        assert_eq!(exe.path, script);
        assert!(exe.exists());

        std::fs::remove_file(&script).unwrap();
        assert!(!exe.exists());
    }

    #[test]
    fn non_executable_file_is_not_resolved() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "not a program").unwrap();

        let err = Executable::resolve(notes.to_str().unwrap(), None).unwrap_err();
        assert!(matches!(err, ProcessError::Resolution { .. }));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn captures_stdout() {
        let sh = Executable::resolve("sh", None).unwrap();
        let invocation = sh.run(&args(&["-c", "echo deployed"])).await;
        assert!(invocation.outcome.is_ok());
        assert_eq!(invocation.output, "deployed\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_an_error_and_keeps_output() {
        let sh = Executable::resolve("sh", None).unwrap();
        let invocation = sh
            .run(&args(&["-c", "echo partial; echo broken >&2; exit 3"]))
            .await;
        assert_eq!(invocation.output, "partial\n");
        let err = invocation.outcome.unwrap_err();
        match &err {
            ProcessError::ExitStatus { status, stderr } => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().ends_with(": broken"));
    }

    #[tokio::test]
    async fn runs_inside_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sh = Executable::resolve("sh", Some(dir.path())).unwrap();
        let invocation = sh.run(&args(&["-c", "pwd -P"])).await;
        assert!(invocation.outcome.is_ok());
        assert_eq!(
            PathBuf::from(invocation.output.trim()),
            dir.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn missing_working_directory_fails_to_spawn() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        let sh = Executable::resolve("sh", Some(&gone)).unwrap();
        let invocation = sh.run(&args(&["-c", "true"])).await;
        assert!(matches!(
            invocation.outcome,
            Err(ProcessError::Spawn { .. })
        ));
    }
}
