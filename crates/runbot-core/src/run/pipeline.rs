use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use thiserror::Error;
use tracing::{error, info, warn};

use super::{RunInfo, RunQueue, RunStatus, RunnerError, TestRunner, TransitionError};
use crate::notify::Notifier;
use crate::report::{ReportError, ReportGenerator, ReportParser, RunReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Runner(#[from] RunnerError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Drives one admitted run to a terminal status.
pub struct ExecutionPipeline {
    runner: Arc<dyn TestRunner>,
    parser: Arc<dyn ReportParser>,
    generator: Arc<dyn ReportGenerator>,
    notifier: Arc<Notifier>,
    queue: Arc<RunQueue>,
}

impl ExecutionPipeline {
    pub fn new(
        runner: Arc<dyn TestRunner>,
        parser: Arc<dyn ReportParser>,
        generator: Arc<dyn ReportGenerator>,
        notifier: Arc<Notifier>,
        queue: Arc<RunQueue>,
    ) -> Self {
        Self {
            runner,
            parser,
            generator,
            notifier,
            queue,
        }
    }

    /// Execute a run on the current worker.
    ///
    /// Never fails and never panics outward: errors and panics end the run
    /// with status Error. The run is always removed from the queue after its
    /// terminal notification.
    pub async fn execute(&self, info: Arc<RunInfo>) {
        let outcome = AssertUnwindSafe(self.drive(&info)).catch_unwind().await;

        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };

        if let Some(message) = failure {
            error!(run_id = %info.run_id(), error = %message, "run failed");
            match info.transition(RunStatus::Error) {
                Ok(()) => self.notifier.error(&info.request, &message).await,
                Err(e) => warn!(error = %e, "run already finished, error not reported"),
            }
        }

        self.queue.remove_run(info.run_id());
    }

    async fn drive(&self, info: &RunInfo) -> Result<(), PipelineError> {
        let request = &info.request;

        info.transition(RunStatus::Running)?;
        self.notifier.running(request).await;

        let outcome = self.runner.run(request).await?;
        let report_url = match self.generator.generate(&request.run_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    run_id = %request.run_id,
                    error = %e,
                    "report generation failed, continuing without a link"
                );
                None
            }
        };
        let suites = self.parser.parse_reports().await?;

        let report = RunReport::from_suites(
            &request.run_id,
            outcome.status,
            outcome.duration,
            suites,
            report_url,
        );

        info.transition(outcome.status)?;
        info!(
            run_id = %request.run_id,
            status = outcome.status.label(),
            total = report.total,
            failed = report.failed,
            "run finished"
        );
        self.notifier.result(request, &report).await;

        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("runner panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("runner panicked: {}", s)
    } else {
        "runner panicked".to_string()
    }
}
