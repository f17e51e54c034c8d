//! Outbound chat messages.
//!
//! [`Notifier`] formats lifecycle and result messages and hands them to a
//! [`MessageSender`]. Delivery failures are logged and swallowed: a chat
//! outage must never change the outcome of a run.

mod telegram;

pub use telegram::{Chat, Message, TelegramClient, Update, User};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::report::RunReport;
use crate::run::RunRequest;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Chat API returned error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// Delivers text to a chat.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a Markdown message to a chat.
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError>;

    /// Publish the command menu. Senders without a menu ignore it.
    async fn set_commands(&self, commands: &[(String, String)]) -> Result<(), NotifyError> {
        debug!(count = commands.len(), "command menu not supported by sender");
        Ok(())
    }
}

/// Formats and delivers run notifications.
pub struct Notifier {
    sender: Arc<dyn MessageSender>,
    max_failed_shown: usize,
}

impl Notifier {
    pub fn new(sender: Arc<dyn MessageSender>, max_failed_shown: usize) -> Self {
        Self {
            sender,
            max_failed_shown,
        }
    }

    pub fn sender(&self) -> &Arc<dyn MessageSender> {
        &self.sender
    }

    /// Send arbitrary text, logging instead of failing.
    pub async fn send(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.sender.send(chat_id, text).await {
            warn!(chat_id, error = %e, "failed to deliver message");
        }
    }

    pub async fn queued(&self, request: &RunRequest) {
        self.send(request.chat_id, &format_queued(request)).await;
    }

    pub async fn running(&self, request: &RunRequest) {
        self.send(request.chat_id, &format_running(request)).await;
    }

    pub async fn result(&self, request: &RunRequest, report: &RunReport) {
        self.send(
            request.chat_id,
            &format_result(request, report, self.max_failed_shown),
        )
        .await;
    }

    pub async fn error(&self, request: &RunRequest, message: &str) {
        self.send(request.chat_id, &format_error(request, message))
            .await;
    }

    pub async fn queue_full(&self, chat_id: i64, capacity: usize) {
        self.send(chat_id, &format_queue_full(capacity)).await;
    }

    pub async fn unknown_command(&self, chat_id: i64, name: &str) {
        self.send(chat_id, &format_unknown_command(name)).await;
    }
}

pub fn format_queued(request: &RunRequest) -> String {
    format!(
        "⏳ *Queued* `{}`\nRun: `{}`\nEnv: {}",
        request.label,
        request.run_id,
        request.env_label()
    )
}

pub fn format_running(request: &RunRequest) -> String {
    format!(
        "🔄 *Running* `{}`\nRun: `{}`\nEnv: {} | Browser: {}",
        request.label,
        request.run_id,
        request.env_label(),
        request.browser
    )
}

pub fn format_result(request: &RunRequest, report: &RunReport, max_failed_shown: usize) -> String {
    let mut text = format!(
        "{} *{}* `{}`\nRun: `{}` | Env: {}\nTests: {} | Passed: {} | Failed: {} | Skipped: {}\nDuration: {}",
        report.status.icon(),
        report.status.label(),
        request.label,
        report.run_id,
        request.env_label(),
        report.total,
        report.passed,
        report.failed,
        report.skipped,
        format_duration(report.duration),
    );

    if let Some(url) = &report.report_url {
        text.push_str(&format!("\nReport: {}", url));
    }

    if !report.failed_tests.is_empty() {
        text.push_str("\n\n*Failed tests:*");
        for (i, case) in report.failed_tests.iter().take(max_failed_shown).enumerate() {
            text.push_str(&format!("\n{}. `{}`", i + 1, case.display_name()));
            if let Some(message) = &case.message {
                text.push_str(&format!(": {}", truncate(message, 200)));
            }
        }
        let hidden = report.failed_tests.len().saturating_sub(max_failed_shown);
        if hidden > 0 {
            text.push_str(&format!("\n...and {} more", hidden));
        }
    }

    text
}

pub fn format_error(request: &RunRequest, message: &str) -> String {
    format!(
        "⚠️ *ERROR* `{}`\nRun: `{}`\n{}",
        request.label,
        request.run_id,
        truncate(message, 500)
    )
}

pub fn format_queue_full(capacity: usize) -> String {
    format!(
        "🚫 Queue is full ({} runs active). Try again when a run finishes.",
        capacity
    )
}

pub fn format_unknown_command(name: &str) -> String {
    format!("❓ Unknown command `/{}`. Send /help for the list.", name)
}

/// `45s`, `2m 05s`, `1h 02m`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {:02}s", secs / 60, secs % 60),
        _ => format!("{}h {:02}m", secs / 3600, (secs % 3600) / 60),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{CaseOutcome, TestCase, TestSuite};
    use crate::run::{RunStatus, RunTarget};

    fn request() -> RunRequest {
        RunRequest::new(1, 1, "ui/login", RunTarget::Class("LoginTest".into()))
            .with_run_id("abc12345")
            .with_env(Some("dev".into()))
    }

    fn failing_suite(failures: usize) -> TestSuite {
        let cases = (0..failures)
            .map(|i| TestCase {
                name: format!("case{}", i),
                class_name: "com.app.LoginTest".to_string(),
                time: 0.1,
                outcome: CaseOutcome::Failed,
                message: Some("boom".to_string()),
            })
            .collect();
        TestSuite {
            name: "com.app.LoginTest".to_string(),
            tests: failures + 1,
            failures,
            errors: 0,
            skipped: 0,
            time: 1.0,
            cases,
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "45s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_duration(Duration::from_secs(3720)), "1h 02m");
    }

    #[test]
    fn test_result_lists_failures_up_to_limit() {
        let report = RunReport::from_suites(
            "abc12345",
            RunStatus::Failed,
            Duration::from_secs(90),
            vec![failing_suite(3)],
            Some("https://reports/abc12345/index.html".to_string()),
        );
        let text = format_result(&request(), &report, 2);
        assert!(text.starts_with("❌ *FAILED* `ui/login`"));
        assert!(text.contains("Tests: 4 | Passed: 1 | Failed: 3"));
        assert!(text.contains("Report: https://reports/abc12345/index.html"));
        assert!(text.contains("1. `LoginTest.case0`: boom"));
        assert!(text.contains("2. `LoginTest.case1`"));
        assert!(!text.contains("case2"));
        assert!(text.contains("...and 1 more"));
    }

    #[test]
    fn test_queued_message() {
        let text = format_queued(&request());
        assert!(text.contains("abc12345"));
        assert!(text.contains("Env: dev"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
