use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{DEFAULT_BROWSER, DEFAULT_HEADLESS};

/// What the external runner is asked to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunTarget {
    /// A build profile (`-P<id>`).
    Profile(String),
    /// A single test class.
    Class(String),
    /// Several test classes run in one process invocation.
    Classes(Vec<String>),
}

impl RunTarget {
    /// The test selector handed to the runner, comma-joined for batches.
    pub fn joined(&self) -> String {
        match self {
            RunTarget::Profile(id) => id.clone(),
            RunTarget::Class(class) => class.clone(),
            RunTarget::Classes(classes) => classes.join(","),
        }
    }

    pub fn is_profile(&self) -> bool {
        matches!(self, RunTarget::Profile(_))
    }
}

/// One user-initiated execution intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub run_id: String,
    pub chat_id: i64,
    pub user_id: i64,
    /// Human-readable name shown in notifications (`smoke`, `ui/login`).
    pub label: String,
    /// Target environment. `None` leaves the choice to the framework.
    pub env: Option<String>,
    pub target: RunTarget,
    pub browser: String,
    pub headless: bool,
    pub submitted_at: DateTime<Utc>,
}

impl RunRequest {
    /// Creates a request with a fresh run id and default browser settings.
    pub fn new(chat_id: i64, user_id: i64, label: impl Into<String>, target: RunTarget) -> Self {
        Self {
            run_id: generate_run_id(),
            chat_id,
            user_id,
            label: label.into(),
            env: None,
            target,
            browser: DEFAULT_BROWSER.to_string(),
            headless: DEFAULT_HEADLESS,
            submitted_at: Utc::now(),
        }
    }

    pub fn with_env(mut self, env: Option<String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = browser.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Overrides the generated id.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Environment for display, `default` when unset.
    pub fn env_label(&self) -> &str {
        self.env.as_deref().unwrap_or("default")
    }
}

/// Short run id: the first 8 characters of a v4 UUID.
pub fn generate_run_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
