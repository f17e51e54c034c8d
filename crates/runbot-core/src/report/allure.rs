use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use super::{ReportError, ReportGenerator};
use crate::config::ReportConfig;

/// Renders Allure HTML reports with the `allure` command line.
pub struct AllureReportGenerator {
    enabled: bool,
    command: String,
    results_dir: PathBuf,
    output_dir: PathBuf,
    base_url: Option<String>,
}

impl AllureReportGenerator {
    /// A generator that never produces a report.
    pub fn disabled() -> Self {
        let config = ReportConfig::default();
        Self {
            enabled: false,
            command: config.allure_command,
            results_dir: PathBuf::from(config.allure_results_dir),
            output_dir: config.allure_output_dir,
            base_url: None,
        }
    }

    /// Results are read relative to `framework_root`.
    pub fn from_config(config: &ReportConfig, framework_root: &Path) -> Self {
        Self {
            enabled: config.allure_enabled,
            command: config.allure_command.clone(),
            results_dir: framework_root.join(&config.allure_results_dir),
            output_dir: config.allure_output_dir.clone(),
            base_url: config.report_base_url.clone(),
        }
    }

    /// Where a run's report is published.
    pub fn report_location(&self, run_id: &str) -> String {
        match &self.base_url {
            Some(base) => format!("{}/{}/index.html", base.trim_end_matches('/'), run_id),
            None => self
                .output_dir
                .join(run_id)
                .join("index.html")
                .display()
                .to_string(),
        }
    }
}

#[async_trait]
impl ReportGenerator for AllureReportGenerator {
    async fn generate(&self, run_id: &str) -> Result<Option<String>, ReportError> {
        if !self.enabled {
            return Ok(None);
        }
        if !self.results_dir.is_dir() {
            warn!(path = %self.results_dir.display(), "no allure results to render");
            return Ok(None);
        }

        let target = self.output_dir.join(run_id);
        let output = Command::new(&self.command)
            .arg("generate")
            .arg(&self.results_dir)
            .arg("-o")
            .arg(&target)
            .arg("--clean")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ReportError::Generation(format!("{}: {}", self.command, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ReportError::Generation(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        let location = self.report_location(run_id);
        info!(run_id = %run_id, report = %location, "allure report generated");
        Ok(Some(location))
    }
}
