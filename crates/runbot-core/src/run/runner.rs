use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{RunRequest, RunStatus, RunTarget};
use crate::config::{ReportConfig, RunnerConfig};

/// Errors raised while executing a run.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Framework path is not configured (set runner.framework_path or RUNBOT_FRAMEWORK_PATH)")]
    NotConfigured,

    #[error("Failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Run timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RunnerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Raw result of one runner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// `Passed` or `Failed`.
    pub status: RunStatus,
    pub duration: Duration,
    pub exit_code: Option<i32>,
}

impl RunOutcome {
    pub fn passed(duration: Duration) -> Self {
        Self {
            status: RunStatus::Passed,
            duration,
            exit_code: Some(0),
        }
    }

    pub fn failed(duration: Duration, exit_code: Option<i32>) -> Self {
        Self {
            status: RunStatus::Failed,
            duration,
            exit_code,
        }
    }
}

/// The external process that actually executes tests.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Execute the request to completion.
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunnerError>;
}

/// Runs tests through the Maven command line.
pub struct MavenRunner {
    framework_path: Option<PathBuf>,
    build_command: String,
    timeout: Option<Duration>,
    surefire_dir: String,
    clean_reports: bool,
}

impl MavenRunner {
    pub fn new(framework_path: impl Into<PathBuf>) -> Self {
        let runner = RunnerConfig::default();
        Self {
            framework_path: Some(framework_path.into()),
            build_command: runner.build_command,
            timeout: None,
            surefire_dir: ReportConfig::default().surefire_dir,
            clean_reports: runner.clean_reports,
        }
    }

    pub fn from_config(runner: &RunnerConfig, report: &ReportConfig) -> Self {
        Self {
            framework_path: runner.framework_path.clone(),
            build_command: runner.build_command.clone(),
            timeout: (runner.run_timeout_secs > 0)
                .then(|| Duration::from_secs(runner.run_timeout_secs)),
            surefire_dir: report.surefire_dir.clone(),
            clean_reports: runner.clean_reports,
        }
    }

    pub fn with_build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = command.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Command line arguments for a request, after the executable.
    pub fn build_args(request: &RunRequest) -> Vec<String> {
        let mut args = vec!["test".to_string()];

        if let Some(env) = &request.env {
            args.push(format!("-Denv={}", env));
        }
        args.push(format!("-Dbrowser={}", request.browser));
        args.push(format!("-Dheadless={}", request.headless));

        match &request.target {
            RunTarget::Profile(profile) => args.push(format!("-P{}", profile)),
            RunTarget::Class(_) | RunTarget::Classes(_) => {
                args.push(format!("-Dtest={}", request.target.joined()));
                args.push("-Dsurefire.failIfNoSpecifiedTests=false".to_string());
            }
        }

        args
    }

    fn log_path(root: &Path, run_id: &str) -> PathBuf {
        root.join("target").join(format!("runbot-{}.log", run_id))
    }

    async fn clean_stale_reports(&self, root: &Path) -> Result<(), RunnerError> {
        let dir = root.join(&self.surefire_dir);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => {
                debug!(path = %dir.display(), "removed stale reports");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(RunnerError::io(dir, e)),
        }
    }
}

#[async_trait]
impl TestRunner for MavenRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunnerError> {
        let root = self
            .framework_path
            .as_deref()
            .ok_or(RunnerError::NotConfigured)?;

        if self.clean_reports {
            self.clean_stale_reports(root).await?;
        }

        let log_path = Self::log_path(root, &request.run_id);
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RunnerError::io(parent, e))?;
        }
        let stdout = std::fs::File::create(&log_path).map_err(|e| RunnerError::io(&log_path, e))?;
        let stderr = stdout
            .try_clone()
            .map_err(|e| RunnerError::io(&log_path, e))?;

        let args = Self::build_args(request);
        info!(
            run_id = %request.run_id,
            command = %self.build_command,
            args = %args.join(" "),
            "starting test run"
        );

        let started = Instant::now();
        let mut child = Command::new(&self.build_command)
            .args(&args)
            .current_dir(root)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                command: self.build_command.clone(),
                source,
            })?;

        let waited = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
            None => Some(child.wait().await),
        };
        let Some(waited) = waited else {
            warn!(run_id = %request.run_id, "run timed out, killing process");
            if let Err(e) = child.start_kill() {
                warn!(run_id = %request.run_id, error = %e, "failed to kill timed out process");
            }
            return Err(RunnerError::Timeout(self.timeout.unwrap_or_default()));
        };
        let exit = waited.map_err(|e| RunnerError::io(root, e))?;
        let duration = started.elapsed();

        info!(
            run_id = %request.run_id,
            exit_code = ?exit.code(),
            duration_secs = duration.as_secs(),
            log = %log_path.display(),
            "test run finished"
        );

        if exit.success() {
            Ok(RunOutcome::passed(duration))
        } else {
            Ok(RunOutcome::failed(duration, exit.code()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_args() {
        let request = RunRequest::new(1, 1, "smoke", RunTarget::Profile("smoke".into()))
            .with_env(Some("dev".into()))
            .with_browser("firefox")
            .with_headless(false);
        assert_eq!(
            MavenRunner::build_args(&request),
            vec!["test", "-Denv=dev", "-Dbrowser=firefox", "-Dheadless=false", "-Psmoke"]
        );
    }

    #[test]
    fn test_batch_args_without_env() {
        let target = RunTarget::Classes(vec!["LoginTest".into(), "LogoutTest".into()]);
        let request = RunRequest::new(1, 1, "auth (all)", target);
        let args = MavenRunner::build_args(&request);
        assert!(!args.iter().any(|a| a.starts_with("-Denv=")));
        assert!(args.contains(&"-Dtest=LoginTest,LogoutTest".to_string()));
        assert!(args.contains(&"-Dsurefire.failIfNoSpecifiedTests=false".to_string()));
    }

    #[tokio::test]
    async fn test_unconfigured_runner() {
        let runner = MavenRunner::from_config(&RunnerConfig::default(), &ReportConfig::default());
        let request = RunRequest::new(1, 1, "smoke", RunTarget::Profile("smoke".into()));
        let result = runner.run(&request).await;
        assert!(matches!(result, Err(RunnerError::NotConfigured)));
    }

    #[tokio::test]
    async fn test_missing_executable_is_spawn_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let runner = MavenRunner::new(temp.path()).with_build_command("runbot-no-such-binary");
        let request = RunRequest::new(1, 1, "login", RunTarget::Class("LoginTest".into()));
        let result = runner.run(&request).await;
        assert!(matches!(result, Err(RunnerError::Spawn { .. })));
    }
}
