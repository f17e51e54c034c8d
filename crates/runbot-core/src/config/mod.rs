//! Configuration management for Runbot.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Environment variables (highest priority)
//! 2. An explicit `--config` file, or project-local `runbot.toml`
//! 3. User config `~/.config/runbot/config.toml`
//! 4. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat client configuration.
    pub bot: BotConfig,

    /// Test execution configuration.
    pub runner: RunnerConfig,

    /// Run queue limits.
    pub queue: QueueConfig,

    /// Command discovery configuration.
    pub discovery: DiscoveryConfig,

    /// Report parsing and generation.
    pub report: ReportConfig,

    /// Logging configuration.
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./runbot.toml` (project local)
    /// 2. `~/.config/runbot/config.toml` (user config)
    /// 3. Falls back to defaults
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("runbot.toml").exists() {
            return Self::from_file("runbot.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("runbot").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from an explicit path when given, otherwise from default locations.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("RUNBOT_BOT_TOKEN") {
            self.bot.token = Some(token);
        }
        if let Ok(username) = std::env::var("RUNBOT_BOT_USERNAME") {
            self.bot.username = Some(username);
        }
        if let Ok(secret) = std::env::var("RUNBOT_WEBHOOK_SECRET") {
            self.bot.webhook_secret = Some(secret);
        }
        if let Ok(url) = std::env::var("RUNBOT_WEBHOOK_URL") {
            self.bot.webhook_url = Some(url);
        }

        if let Ok(path) = std::env::var("RUNBOT_FRAMEWORK_PATH") {
            self.runner.framework_path = Some(PathBuf::from(path));
        }
        if let Ok(env) = std::env::var("RUNBOT_DEFAULT_ENV") {
            self.runner.default_env = Some(env);
        }

        if let Ok(size) = std::env::var("RUNBOT_MAX_QUEUE_SIZE") {
            if let Ok(n) = size.parse() {
                self.queue.max_queue_size = n;
            }
        }
        if let Ok(parallel) = std::env::var("RUNBOT_MAX_PARALLEL") {
            if let Ok(n) = parallel.parse() {
                self.queue.max_parallel = n;
            }
        }

        if let Ok(strategy) = std::env::var("RUNBOT_DISCOVERY_STRATEGY") {
            if let Ok(s) = strategy.parse() {
                self.discovery.strategy = s;
            }
        }

        if let Ok(level) = std::env::var("RUNBOT_LOG_LEVEL") {
            self.log.level = level;
        }
    }

    /// Check invariants the rest of the system relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue.max_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "queue.max_queue_size must be at least 1".to_string(),
            ));
        }
        if self.queue.max_parallel == 0 {
            return Err(ConfigError::Invalid(
                "queue.max_parallel must be at least 1".to_string(),
            ));
        }
        if self.queue.max_parallel > 1 {
            // Every run writes to the same surefire directory.
            if self.runner.clean_reports {
                return Err(ConfigError::Invalid(format!(
                    "queue.max_parallel = {} would let runs delete each other's reports in {}; \
                     use 1 or set runner.clean_reports = false",
                    self.queue.max_parallel, self.report.surefire_dir
                )));
            }
            warn!(
                max_parallel = self.queue.max_parallel,
                surefire_dir = %self.report.surefire_dir,
                "parallel runs share one report directory, results may mix"
            );
        }
        if self.runner.build_command.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "runner.build_command must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Chat client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Bot API token (prefer `RUNBOT_BOT_TOKEN`).
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Bot username, used to strip `/command@username` suffixes.
    pub username: Option<String>,

    /// Bot API base URL.
    pub api_url: String,

    /// Long-poll timeout in seconds.
    pub poll_timeout_secs: u64,

    /// Port for the webhook front end.
    pub webhook_port: u16,

    /// Public URL Telegram delivers updates to. When set, the webhook
    /// front end registers it on startup.
    pub webhook_url: Option<String>,

    /// Shared secret Telegram echoes in `X-Telegram-Bot-Api-Secret-Token`
    /// (prefer `RUNBOT_WEBHOOK_SECRET`).
    #[serde(skip_serializing)]
    pub webhook_secret: Option<String>,

    /// Chats allowed to issue commands. Empty means every chat.
    pub allowed_chats: Vec<i64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: None,
            username: None,
            api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            webhook_port: DEFAULT_WEBHOOK_PORT,
            webhook_url: None,
            webhook_secret: None,
            allowed_chats: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Get the token, or an error naming the variable to set.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "bot token missing: set bot.token or RUNBOT_BOT_TOKEN".to_string(),
                )
            })
    }

    /// Get the webhook secret. Telegram accepts 1-256 characters of
    /// `A-Z`, `a-z`, `0-9`, `_` and `-`.
    pub fn require_webhook_secret(&self) -> Result<&str, ConfigError> {
        let secret = self
            .webhook_secret
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                ConfigError::Invalid(
                    "webhook secret missing: set bot.webhook_secret or RUNBOT_WEBHOOK_SECRET"
                        .to_string(),
                )
            })?;

        let valid = secret.len() <= 256
            && secret
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ConfigError::Invalid(
                "bot.webhook_secret may only contain A-Z, a-z, 0-9, _ and - (max 256)".to_string(),
            ));
        }
        Ok(secret)
    }
}

/// Test execution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Root of the test framework checkout. Discovery is skipped when unset.
    pub framework_path: Option<PathBuf>,

    /// Build tool executable.
    pub build_command: String,

    /// Browser passed to every run.
    pub default_browser: String,

    /// Whether runs are headless.
    pub headless: bool,

    /// Environment used when neither the command nor the session names one.
    /// When unset the framework's own default applies.
    pub default_env: Option<String>,

    /// Per-run timeout in seconds. Zero disables the timeout.
    pub run_timeout_secs: u64,

    /// Remove stale surefire reports before each run.
    pub clean_reports: bool,

    /// Environments accepted by `/env`. Empty accepts anything.
    pub supported_envs: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            framework_path: None,
            build_command: DEFAULT_BUILD_COMMAND.to_string(),
            default_browser: DEFAULT_BROWSER.to_string(),
            headless: DEFAULT_HEADLESS,
            default_env: None,
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            clean_reports: true,
            supported_envs: DEFAULT_SUPPORTED_ENVS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Run queue limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum tracked runs; submissions beyond this are refused.
    pub max_queue_size: usize,

    /// Maximum runs executing at the same time.
    pub max_parallel: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

/// How discovered test units become commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryStrategy {
    /// One command per profile and per test class.
    Flat,
    /// One command per test directory, with one sub-command per class.
    #[default]
    Grouped,
    /// Only the built-in commands.
    Disabled,
}

impl FromStr for DiscoveryStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flat" => Ok(Self::Flat),
            "grouped" => Ok(Self::Grouped),
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            other => Err(ConfigError::Invalid(format!(
                "unknown discovery strategy: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DiscoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flat => write!(f, "flat"),
            Self::Grouped => write!(f, "grouped"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// Command discovery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Which discovery strategy registers dynamic commands.
    pub strategy: DiscoveryStrategy,

    /// Test source directory relative to the framework root.
    pub test_source_dir: String,

    /// Build descriptor relative to the framework root.
    pub descriptor_file: String,

    /// File name suffix that marks a test class.
    pub test_file_suffix: String,

    /// Class names never exposed as commands.
    pub excluded_classes: Vec<String>,

    /// Directory names whose contents are never exposed as commands.
    pub excluded_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: DiscoveryStrategy::default(),
            test_source_dir: DEFAULT_TEST_SOURCE_DIR.to_string(),
            descriptor_file: DEFAULT_DESCRIPTOR_FILE.to_string(),
            test_file_suffix: DEFAULT_TEST_FILE_SUFFIX.to_string(),
            excluded_classes: DEFAULT_EXCLUDED_CLASSES.iter().map(|s| s.to_string()).collect(),
            excluded_dirs: DEFAULT_EXCLUDED_DIRS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Report parsing and generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Surefire XML directory relative to the framework root.
    pub surefire_dir: String,

    /// Generate an Allure report after each run.
    pub allure_enabled: bool,

    /// Allure executable.
    pub allure_command: String,

    /// Allure raw results relative to the framework root.
    pub allure_results_dir: String,

    /// Directory receiving generated reports, one sub-directory per run.
    pub allure_output_dir: PathBuf,

    /// Public URL under which `allure_output_dir` is served.
    pub report_base_url: Option<String>,

    /// Maximum failed tests listed in a result message.
    pub max_failed_shown: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            surefire_dir: DEFAULT_SUREFIRE_DIR.to_string(),
            allure_enabled: false,
            allure_command: DEFAULT_ALLURE_COMMAND.to_string(),
            allure_results_dir: DEFAULT_ALLURE_RESULTS_DIR.to_string(),
            allure_output_dir: PathBuf::from(DEFAULT_ALLURE_OUTPUT_DIR),
            report_base_url: None,
            max_failed_shown: DEFAULT_MAX_FAILED_SHOWN,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}
