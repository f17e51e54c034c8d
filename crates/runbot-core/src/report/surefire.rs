use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{CaseOutcome, ReportError, ReportParser, TestCase, TestSuite};

/// Reads Surefire `TEST-*.xml` reports from one directory.
pub struct SurefireReportParser {
    report_dir: PathBuf,
}

impl SurefireReportParser {
    pub fn new(report_dir: impl Into<PathBuf>) -> Self {
        Self {
            report_dir: report_dir.into(),
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }
}

#[async_trait]
impl ReportParser for SurefireReportParser {
    async fn parse_reports(&self) -> Result<Vec<TestSuite>, ReportError> {
        if !self.report_dir.is_dir() {
            warn!(path = %self.report_dir.display(), "report directory not found");
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&self.report_dir)
            .await
            .map_err(|e| ReportError::io(&self.report_dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReportError::io(&self.report_dir, e))?
        {
            let path = entry.path();
            let is_report = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("TEST-") && n.ends_with(".xml"));
            if is_report {
                files.push(path);
            }
        }
        files.sort();

        let mut suites = Vec::with_capacity(files.len());
        for path in files {
            let xml = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ReportError::io(&path, e))?;
            let suite = parse_suite(&xml).map_err(|message| ReportError::Malformed {
                path: path.clone(),
                message,
            })?;
            debug!(
                suite = %suite.name,
                tests = suite.tests,
                failures = suite.failures,
                errors = suite.errors,
                "parsed report"
            );
            suites.push(suite);
        }

        Ok(suites)
    }
}

/// Parse one Surefire XML document.
pub fn parse_suite(xml: &str) -> Result<TestSuite, String> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| e.to_string())?;
    let suite = doc
        .descendants()
        .find(|node| is_element(node, "testsuite"))
        .ok_or_else(|| "no <testsuite> element".to_string())?;

    let cases: Vec<TestCase> = suite
        .children()
        .filter(|node| is_element(node, "testcase"))
        .map(|case| parse_case(&case))
        .collect();

    let count = |key: &str, fallback: usize| {
        suite
            .attribute(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(fallback)
    };
    let outcomes = |outcome: CaseOutcome| cases.iter().filter(|c| c.outcome == outcome).count();

    Ok(TestSuite {
        name: suite.attribute("name").unwrap_or_default().to_string(),
        tests: count("tests", cases.len()),
        failures: count("failures", outcomes(CaseOutcome::Failed)),
        errors: count("errors", outcomes(CaseOutcome::Errored)),
        skipped: count("skipped", outcomes(CaseOutcome::Skipped)),
        time: number(suite.attribute("time")),
        cases,
    })
}

fn parse_case(case: &roxmltree::Node) -> TestCase {
    let problem = case
        .children()
        .find(|node| is_element(node, "failure") || is_element(node, "error"));

    let (outcome, message) = match problem {
        Some(problem) => {
            let outcome = if problem.tag_name().name() == "error" {
                CaseOutcome::Errored
            } else {
                CaseOutcome::Failed
            };
            let message = problem
                .attribute("message")
                .filter(|m| !m.trim().is_empty())
                .map(str::to_string)
                .or_else(|| first_line(&problem))
                .or_else(|| problem.attribute("type").map(str::to_string));
            (outcome, message)
        }
        None if case.children().any(|node| is_element(&node, "skipped")) => {
            (CaseOutcome::Skipped, None)
        }
        None => (CaseOutcome::Passed, None),
    };

    TestCase {
        name: case.attribute("name").unwrap_or_default().to_string(),
        class_name: case.attribute("classname").unwrap_or_default().to_string(),
        time: number(case.attribute("time")),
        outcome,
        message,
    }
}

fn is_element(node: &roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Surefire writes times like `1,234.5` in some locales.
fn number(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.replace(',', "").trim().parse().ok())
        .unwrap_or(0.0)
}

/// First non-blank line of an element's text, CDATA included.
fn first_line(node: &roxmltree::Node) -> Option<String> {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuite name="com.app.ui.LoginTest" time="12.5" tests="4" errors="1" skipped="1" failures="1">
  <properties>
    <property name="env" value="dev"/>
  </properties>
  <testcase name="validLogin" classname="com.app.ui.LoginTest" time="3.1"/>
  <testcase name="invalidPassword" classname="com.app.ui.LoginTest" time="2.0">
    <failure message="expected [Welcome] but found [Error &amp; retry]" type="java.lang.AssertionError">
      java.lang.AssertionError: expected [Welcome]
    </failure>
  </testcase>
  <testcase name="lockedUser" classname="com.app.ui.LoginTest" time="1.0">
    <error type="org.openqa.selenium.TimeoutException"><![CDATA[Timed out after 30s
    at Wait.until]]></error>
  </testcase>
  <testcase name="sso" classname="com.app.ui.LoginTest" time="0">
    <skipped/>
  </testcase>
</testsuite>
"#;

    #[test]
    fn test_parse_suite() {
        let suite = parse_suite(REPORT).unwrap();
        assert_eq!(suite.name, "com.app.ui.LoginTest");
        assert_eq!(suite.tests, 4);
        assert_eq!(suite.failures, 1);
        assert_eq!(suite.errors, 1);
        assert_eq!(suite.skipped, 1);
        assert_eq!(suite.cases.len(), 4);

        let outcomes: Vec<_> = suite.cases.iter().map(|c| c.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                CaseOutcome::Passed,
                CaseOutcome::Failed,
                CaseOutcome::Errored,
                CaseOutcome::Skipped
            ]
        );
    }

    #[test]
    fn test_failure_messages() {
        let suite = parse_suite(REPORT).unwrap();
        assert_eq!(
            suite.cases[1].message.as_deref(),
            Some("expected [Welcome] but found [Error & retry]")
        );
        assert_eq!(suite.cases[2].message.as_deref(), Some("Timed out after 30s"));
    }

    #[test]
    fn test_markup_inside_cdata_stays_text() {
        let xml = r#"<testsuite name="s" tests="1" failures="1">
  <testcase name="render" classname="PageTest">
    <failure><![CDATA[expected <div class="ok"> but was </span>]]></failure>
  </testcase>
</testsuite>"#;
        let suite = parse_suite(xml).unwrap();
        assert_eq!(suite.cases[0].outcome, CaseOutcome::Failed);
        assert_eq!(
            suite.cases[0].message.as_deref(),
            Some(r#"expected <div class="ok"> but was </span>"#)
        );
    }

    #[test]
    fn test_missing_suite_is_error() {
        assert!(parse_suite("<testcase name=\"x\"/>").is_err());
    }

    #[test]
    fn test_counts_fall_back_to_cases() {
        let xml = r#"<testsuite name="s"><testcase name="a" classname="A"><failure/></testcase></testsuite>"#;
        let suite = parse_suite(xml).unwrap();
        assert_eq!(suite.tests, 1);
        assert_eq!(suite.failures, 1);
    }
}
