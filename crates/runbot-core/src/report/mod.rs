//! Test report parsing and generation.
//!
//! After a run finishes, the framework leaves two kinds of artifacts behind:
//! Surefire XML files (parsed into [`TestSuite`]s for the result message) and
//! raw Allure results (optionally rendered into an HTML report whose location
//! is linked from the result message).

mod allure;
mod surefire;

pub use allure::AllureReportGenerator;
pub use surefire::{parse_suite, SurefireReportParser};

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::run::RunStatus;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed report {}: {message}", path.display())]
    Malformed { path: PathBuf, message: String },

    #[error("Report generation failed: {0}")]
    Generation(String),
}

impl ReportError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReportError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Outcome of a single test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseOutcome {
    Passed,
    Failed,
    Errored,
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    pub class_name: String,
    pub time: f64,
    pub outcome: CaseOutcome,
    /// Failure or error message, when there is one.
    pub message: Option<String>,
}

impl TestCase {
    pub fn is_failure(&self) -> bool {
        matches!(self.outcome, CaseOutcome::Failed | CaseOutcome::Errored)
    }

    /// `SimpleClass.method` for display.
    pub fn display_name(&self) -> String {
        let simple = self
            .class_name
            .rsplit('.')
            .next()
            .unwrap_or(&self.class_name);
        if simple.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", simple, self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    pub tests: usize,
    pub failures: usize,
    pub errors: usize,
    pub skipped: usize,
    pub time: f64,
    pub cases: Vec<TestCase>,
}

/// Failed and errored cases across every suite, in report order.
pub fn failed_tests(suites: &[TestSuite]) -> Vec<TestCase> {
    suites
        .iter()
        .flat_map(|suite| suite.cases.iter())
        .filter(|case| case.is_failure())
        .cloned()
        .collect()
}

/// Aggregated result of a finished run, as delivered to the chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    pub duration: Duration,
    pub report_url: Option<String>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failed_tests: Vec<TestCase>,
    pub suites: Vec<TestSuite>,
}

impl RunReport {
    pub fn from_suites(
        run_id: impl Into<String>,
        status: RunStatus,
        duration: Duration,
        suites: Vec<TestSuite>,
        report_url: Option<String>,
    ) -> Self {
        let total: usize = suites.iter().map(|s| s.tests).sum();
        let failed: usize = suites.iter().map(|s| s.failures + s.errors).sum();
        let skipped: usize = suites.iter().map(|s| s.skipped).sum();

        Self {
            run_id: run_id.into(),
            status,
            duration,
            report_url,
            total,
            passed: total.saturating_sub(failed + skipped),
            failed,
            skipped,
            failed_tests: failed_tests(&suites),
            suites,
        }
    }
}

/// Reads structured results left behind by a run.
#[async_trait]
pub trait ReportParser: Send + Sync {
    async fn parse_reports(&self) -> Result<Vec<TestSuite>, ReportError>;
}

/// Renders a browsable report for a run.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Returns the report location, or `None` when no report was produced.
    async fn generate(&self, run_id: &str) -> Result<Option<String>, ReportError>;
}
