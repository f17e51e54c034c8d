#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use runbot_core::notify::{MessageSender, Notifier, NotifyError};
use runbot_core::report::{
    AllureReportGenerator, ReportError, ReportGenerator, ReportParser, TestSuite,
};
use runbot_core::run::{RunnerError, RunOutcome, TestRunner};
use runbot_core::{RunDefaults, RunQueue, RunRequest, RunServices};

/// Records every message instead of delivering it.
#[derive(Default)]
pub struct RecordingSender {
    messages: Mutex<Vec<(i64, String)>>,
    menu: Mutex<Vec<(String, String)>>,
}

impl RecordingSender {
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages().into_iter().map(|(_, text)| text).collect()
    }

    pub fn menu(&self) -> Vec<(String, String)> {
        self.menu.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    async fn send(&self, chat_id: i64, text: &str) -> Result<(), NotifyError> {
        self.messages.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn set_commands(&self, commands: &[(String, String)]) -> Result<(), NotifyError> {
        *self.menu.lock().unwrap() = commands.to_vec();
        Ok(())
    }
}

#[derive(Clone, Copy)]
pub enum Script {
    Pass,
    Fail,
    Error,
    Panic,
}

/// Test runner with a fixed behaviour that records what it was asked to run.
pub struct ScriptedRunner {
    script: Script,
    requests: Mutex<Vec<RunRequest>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedRunner {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Block every run until the gate hands out a permit.
    pub fn gated(script: Script, gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(script)
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestRunner for ScriptedRunner {
    async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunnerError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.script {
            Script::Pass => Ok(RunOutcome::passed(Duration::from_secs(3))),
            Script::Fail => Ok(RunOutcome::failed(Duration::from_secs(3), Some(1))),
            Script::Error => Err(RunnerError::NotConfigured),
            Script::Panic => panic!("browser crashed"),
        }
    }
}

/// Parser that always fails.
pub struct BrokenParser;

#[async_trait]
impl ReportParser for BrokenParser {
    async fn parse_reports(&self) -> Result<Vec<TestSuite>, ReportError> {
        Err(ReportError::Malformed {
            path: "TEST-broken.xml".into(),
            message: "no <testsuite> element".to_string(),
        })
    }
}

/// Parser that finds no reports.
pub struct EmptyParser;

#[async_trait]
impl ReportParser for EmptyParser {
    async fn parse_reports(&self) -> Result<Vec<TestSuite>, ReportError> {
        Ok(Vec::new())
    }
}

/// Report generator whose tool is missing.
pub struct BrokenGenerator;

#[async_trait]
impl ReportGenerator for BrokenGenerator {
    async fn generate(&self, _run_id: &str) -> Result<Option<String>, ReportError> {
        Err(ReportError::Generation(
            "allure: No such file or directory".to_string(),
        ))
    }
}

pub struct Harness {
    pub services: Arc<RunServices>,
    pub sender: Arc<RecordingSender>,
    pub runner: Arc<ScriptedRunner>,
}

pub fn harness(runner: ScriptedRunner, capacity: usize, parallel: usize) -> Harness {
    harness_with_parser(runner, Arc::new(EmptyParser), capacity, parallel)
}

pub fn harness_with_parser(
    runner: ScriptedRunner,
    parser: Arc<dyn ReportParser>,
    capacity: usize,
    parallel: usize,
) -> Harness {
    harness_with(
        runner,
        parser,
        Arc::new(AllureReportGenerator::disabled()),
        capacity,
        parallel,
    )
}

pub fn harness_with(
    runner: ScriptedRunner,
    parser: Arc<dyn ReportParser>,
    generator: Arc<dyn ReportGenerator>,
    capacity: usize,
    parallel: usize,
) -> Harness {
    let sender = Arc::new(RecordingSender::default());
    let runner = Arc::new(runner);
    let services = RunServices::new(
        Arc::new(RunQueue::new(capacity, parallel)),
        runner.clone(),
        parser,
        generator,
        Arc::new(Notifier::new(sender.clone(), 10)),
        RunDefaults::default(),
    );
    Harness {
        services: Arc::new(services),
        sender,
        runner,
    }
}

/// Wait until every tracked run has been removed.
pub async fn wait_idle(queue: &RunQueue) {
    for _ in 0..500 {
        if queue.active_count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("runs still active: {}", queue.active_count());
}

pub fn touch(root: &Path, relative: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "public class Placeholder {}").unwrap();
}

pub const POM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<project>
    <profiles>
        <profile><id>smoke</id></profile>
        <profile><id>regression</id></profile>
        <profile><id>api</id></profile>
    </profiles>
</project>
"#;

/// A framework checkout with profiles, grouped tests and excluded helpers.
pub fn framework(root: &Path) {
    fs::write(root.join("pom.xml"), POM).unwrap();
    touch(root, "src/test/java/com/app/auth/LoginTest.java");
    touch(root, "src/test/java/com/app/auth/LogoutTest.java");
    touch(root, "src/test/java/com/app/products/CreateProductTest.java");
    touch(root, "src/test/java/com/app/products/HomePageTest.java");
    touch(root, "src/test/java/com/app/base/BaseTest.java");
    touch(root, "src/test/java/com/app/base/SetupTest.java");
    touch(root, "src/test/java/com/app/dataproviders/UserDataTest.java");
    touch(root, "src/test/java/com/app/api/BaseApiTest.java");
    touch(root, "src/test/java/com/app/api/AuthApiTest.java");
    touch(root, "src/test/java/RootLevelTest.java");
}
