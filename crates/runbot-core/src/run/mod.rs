//! Run lifecycle: requests, the admission-controlled queue, the external
//! test runner and the pipeline that drives each run to a terminal status.

mod pipeline;
mod queue;
mod request;
mod runner;
mod services;
mod status;

pub use pipeline::{ExecutionPipeline, PipelineError};
pub use queue::{QueueError, RunQueue};
pub use request::{generate_run_id, RunRequest, RunTarget};
pub use runner::{MavenRunner, RunOutcome, RunnerError, TestRunner};
pub use services::{RunDefaults, RunServices};
pub use status::{RunInfo, RunStatus, TransitionError};
