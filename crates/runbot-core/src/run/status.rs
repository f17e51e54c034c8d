use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::RunRequest;

/// Lifecycle status of a tracked run.
///
/// Runs move strictly forward:
/// Queued → Running → Passed | Failed | Error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Queued,
    Running,
    Passed,
    Failed,
    Error,
}

impl RunStatus {
    /// Returns true once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Passed | RunStatus::Failed | RunStatus::Error)
    }

    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        match self {
            RunStatus::Queued => next == RunStatus::Running,
            RunStatus::Running => next.is_terminal(),
            _ => false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Queued => "QUEUED",
            RunStatus::Running => "RUNNING",
            RunStatus::Passed => "PASSED",
            RunStatus::Failed => "FAILED",
            RunStatus::Error => "ERROR",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            RunStatus::Queued => "⏳",
            RunStatus::Running => "🔄",
            RunStatus::Passed => "✅",
            RunStatus::Failed => "❌",
            RunStatus::Error => "⚠️",
        }
    }
}

#[derive(Debug, Error)]
#[error("Run {run_id}: cannot go from {from:?} to {to:?}")]
pub struct TransitionError {
    pub run_id: String,
    pub from: RunStatus,
    pub to: RunStatus,
}

#[derive(Debug)]
struct RunState {
    status: RunStatus,
    history: Vec<(RunStatus, DateTime<Utc>)>,
}

/// Queue-tracked execution state of a request.
///
/// Shared by reference between the queue registry and the worker that owns
/// the run, so readers see status changes as they happen.
#[derive(Debug)]
pub struct RunInfo {
    pub request: RunRequest,
    state: Mutex<RunState>,
}

impl RunInfo {
    pub fn new(request: RunRequest) -> Self {
        Self {
            request,
            state: Mutex::new(RunState {
                status: RunStatus::Queued,
                history: vec![(RunStatus::Queued, Utc::now())],
            }),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.request.run_id
    }

    pub fn status(&self) -> RunStatus {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).status
    }

    /// Every status this run has held, oldest first.
    pub fn history(&self) -> Vec<RunStatus> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.history.iter().map(|(status, _)| *status).collect()
    }

    /// When the run entered `status`, if it ever did.
    pub fn entered_at(&self, status: RunStatus) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .history
            .iter()
            .find(|(s, _)| *s == status)
            .map(|(_, at)| *at)
    }

    /// Move to `next`, rejecting anything but a forward step.
    pub fn transition(&self, next: RunStatus) -> Result<(), TransitionError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.status.can_transition_to(next) {
            return Err(TransitionError {
                run_id: self.request.run_id.clone(),
                from: state.status,
                to: next,
            });
        }
        state.status = next;
        state.history.push((next, Utc::now()));
        Ok(())
    }
}
