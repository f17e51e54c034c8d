mod common;

use std::fs;
use std::sync::Arc;

use runbot_core::report::SurefireReportParser;
use runbot_core::{RunRequest, RunStatus, RunTarget};
use tempfile::TempDir;

use common::{
    harness, harness_with, harness_with_parser, wait_idle, BrokenGenerator, BrokenParser, EmptyParser,
    Harness, Script, ScriptedRunner,
};

fn request() -> RunRequest {
    RunRequest::new(5, 9, "auth/login", RunTarget::Class("LoginTest".into()))
        .with_env(Some("dev".into()))
}

async fn run_once(h: &Harness) -> Vec<RunStatus> {
    let info = h.services.submit(request()).await.unwrap();
    wait_idle(&h.services.queue).await;
    assert!(h.services.queue.get(info.run_id()).is_none());
    info.history()
}

fn assert_ordered(texts: &[String], terminal_prefix: &str) {
    assert_eq!(texts.len(), 3, "unexpected messages: {:?}", texts);
    assert!(texts[0].starts_with("⏳ *Queued*"));
    assert!(texts[1].starts_with("🔄 *Running*"));
    assert!(
        texts[2].starts_with(terminal_prefix),
        "terminal message was {:?}",
        texts[2]
    );
}

#[tokio::test]
async fn test_passed_run() {
    let h = harness(ScriptedRunner::new(Script::Pass), 3, 1);
    let history = run_once(&h).await;

    assert_eq!(history, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Passed]);
    assert_ordered(&h.sender.texts(), "✅ *PASSED*");
}

#[tokio::test]
async fn test_failed_run() {
    let h = harness(ScriptedRunner::new(Script::Fail), 3, 1);
    let history = run_once(&h).await;

    assert_eq!(history, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Failed]);
    assert_ordered(&h.sender.texts(), "❌ *FAILED*");
}

#[tokio::test]
async fn test_runner_error_becomes_error_status() {
    let h = harness(ScriptedRunner::new(Script::Error), 3, 1);
    let history = run_once(&h).await;

    assert_eq!(history, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Error]);
    let texts = h.sender.texts();
    assert_ordered(&texts, "⚠️ *ERROR*");
    assert!(texts[2].contains("Framework path is not configured"));
}

#[tokio::test]
async fn test_panicking_runner_becomes_error_and_is_removed() {
    let h = harness(ScriptedRunner::new(Script::Panic), 3, 1);
    let history = run_once(&h).await;

    assert_eq!(history, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Error]);
    let texts = h.sender.texts();
    assert_ordered(&texts, "⚠️ *ERROR*");
    assert!(texts[2].contains("browser crashed"));

    // the worker pool survives the panic
    let history = run_once(&h).await;
    assert_eq!(history.last(), Some(&RunStatus::Error));
}

#[tokio::test]
async fn test_parser_failure_becomes_error() {
    let h = harness_with_parser(ScriptedRunner::new(Script::Pass), Arc::new(BrokenParser), 3, 1);
    let history = run_once(&h).await;

    assert_eq!(history, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Error]);
    assert!(h.sender.texts()[2].contains("no <testsuite> element"));
}

#[tokio::test]
async fn test_report_generation_failure_keeps_run_result() {
    let h = harness_with(
        ScriptedRunner::new(Script::Pass),
        Arc::new(EmptyParser),
        Arc::new(BrokenGenerator),
        3,
        1,
    );
    let history = run_once(&h).await;

    assert_eq!(history, vec![RunStatus::Queued, RunStatus::Running, RunStatus::Passed]);
    let texts = h.sender.texts();
    assert_ordered(&texts, "✅ *PASSED*");
    assert!(!texts[2].contains("Report:"));
}

#[tokio::test]
async fn test_result_includes_failed_tests_from_reports() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("TEST-com.app.auth.LoginTest.xml"),
        r#"<testsuite name="com.app.auth.LoginTest" tests="2" failures="1" errors="0" skipped="0" time="4.2">
  <testcase name="validLogin" classname="com.app.auth.LoginTest" time="2.0"/>
  <testcase name="wrongPassword" classname="com.app.auth.LoginTest" time="2.2">
    <failure message="expected error banner">AssertionError</failure>
  </testcase>
</testsuite>"#,
    )
    .unwrap();
    fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

    let parser = Arc::new(SurefireReportParser::new(temp.path()));
    let h = harness_with_parser(ScriptedRunner::new(Script::Fail), parser, 3, 1);
    run_once(&h).await;

    let result = &h.sender.texts()[2];
    assert!(result.contains("Tests: 2 | Passed: 1 | Failed: 1 | Skipped: 0"));
    assert!(result.contains("`LoginTest.wrongPassword`: expected error banner"));
    assert!(result.contains("Env: dev"));
}

#[tokio::test]
async fn test_notifications_go_to_originating_chat() {
    let h = harness(ScriptedRunner::new(Script::Pass), 3, 1);
    run_once(&h).await;

    assert!(h.sender.messages().iter().all(|(chat, _)| *chat == 5));
}

#[tokio::test]
async fn test_many_runs_each_get_one_terminal_message() {
    let h = harness(ScriptedRunner::new(Script::Pass), 10, 3);
    for _ in 0..6 {
        h.services.submit(request()).await.unwrap();
    }
    wait_idle(&h.services.queue).await;

    let texts = h.sender.texts();
    let count = |prefix: &str| texts.iter().filter(|t| t.starts_with(prefix)).count();
    assert_eq!(count("⏳"), 6);
    assert_eq!(count("🔄"), 6);
    assert_eq!(count("✅"), 6);
    assert_eq!(h.runner.requests().len(), 6);
}
