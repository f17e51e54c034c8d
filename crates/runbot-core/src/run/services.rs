use std::path::PathBuf;
use std::sync::Arc;

use tracing::warn;

use super::{
    ExecutionPipeline, MavenRunner, QueueError, RunInfo, RunQueue, RunRequest, RunTarget,
    TestRunner,
};
use crate::config::{Config, RunnerConfig};
use crate::notify::{MessageSender, Notifier};
use crate::report::{AllureReportGenerator, ReportGenerator, ReportParser, SurefireReportParser};
use crate::session::SessionStore;

/// Settings applied to every request a command builds.
#[derive(Debug, Clone)]
pub struct RunDefaults {
    pub browser: String,
    pub headless: bool,
    /// Used when neither the command nor the session names an environment.
    pub env: Option<String>,
    /// Environments accepted by `/env`. Empty accepts anything.
    pub supported_envs: Vec<String>,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self::from_config(&RunnerConfig::default())
    }
}

impl RunDefaults {
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self {
            browser: config.default_browser.clone(),
            headless: config.headless,
            env: config.default_env.as_ref().map(|e| e.trim().to_lowercase()),
            supported_envs: config
                .supported_envs
                .iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
        }
    }

    pub fn is_supported_env(&self, env: &str) -> bool {
        self.supported_envs.is_empty() || self.supported_envs.iter().any(|e| e == env)
    }
}

/// Shared collaborators handed to every command.
pub struct RunServices {
    pub queue: Arc<RunQueue>,
    pub pipeline: Arc<ExecutionPipeline>,
    pub notifier: Arc<Notifier>,
    pub sessions: Arc<SessionStore>,
    pub defaults: RunDefaults,
}

impl RunServices {
    pub fn new(
        queue: Arc<RunQueue>,
        runner: Arc<dyn TestRunner>,
        parser: Arc<dyn ReportParser>,
        generator: Arc<dyn ReportGenerator>,
        notifier: Arc<Notifier>,
        defaults: RunDefaults,
    ) -> Self {
        let pipeline = ExecutionPipeline::new(
            runner,
            parser,
            generator,
            notifier.clone(),
            queue.clone(),
        );
        Self {
            queue,
            pipeline: Arc::new(pipeline),
            notifier,
            sessions: Arc::new(SessionStore::new()),
            defaults,
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &Config, sender: Arc<dyn MessageSender>) -> Self {
        let root = config
            .runner
            .framework_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));

        let notifier = Arc::new(Notifier::new(sender, config.report.max_failed_shown));
        Self::new(
            Arc::new(RunQueue::from_config(&config.queue)),
            Arc::new(MavenRunner::from_config(&config.runner, &config.report)),
            Arc::new(SurefireReportParser::new(root.join(&config.report.surefire_dir))),
            Arc::new(AllureReportGenerator::from_config(&config.report, &root)),
            notifier,
            RunDefaults::from_config(&config.runner),
        )
    }

    /// Environment precedence: explicit argument, then the user's session,
    /// then the configured default.
    pub fn resolve_env(&self, user_id: i64, explicit: Option<&str>) -> Option<String> {
        explicit
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .or_else(|| self.sessions.get_env(user_id))
            .or_else(|| self.defaults.env.clone())
    }

    /// A request carrying the configured browser settings.
    pub fn request(
        &self,
        chat_id: i64,
        user_id: i64,
        label: impl Into<String>,
        target: RunTarget,
        env: Option<String>,
    ) -> RunRequest {
        RunRequest::new(chat_id, user_id, label, target)
            .with_env(env)
            .with_browser(&self.defaults.browser)
            .with_headless(self.defaults.headless)
    }

    /// Admit a request, announce it, then hand it to a worker.
    ///
    /// The queued notification is sent before dispatch, so it always
    /// precedes the running notification.
    pub async fn submit(&self, request: RunRequest) -> Option<Arc<RunInfo>> {
        let chat_id = request.chat_id;
        match self.queue.admit(request) {
            Ok(info) => {
                self.notifier.queued(&info.request).await;
                let pipeline = self.pipeline.clone();
                self.queue
                    .dispatch(info.clone(), move |info| async move {
                        pipeline.execute(info).await
                    });
                Some(info)
            }
            Err(QueueError::Full { capacity }) => {
                warn!(chat_id, capacity, "run refused, queue full");
                self.notifier.queue_full(chat_id, capacity).await;
                None
            }
        }
    }
}
