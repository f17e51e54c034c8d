//! Default values for Runbot configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Bot Defaults
// ============================================================================

/// Default Telegram Bot API base URL.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Long-poll timeout for `getUpdates` (seconds).
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 30;

/// Port for the webhook front end.
pub const DEFAULT_WEBHOOK_PORT: u16 = 8088;

// ============================================================================
// Runner Defaults
// ============================================================================

/// Build tool invoked to execute tests.
pub const DEFAULT_BUILD_COMMAND: &str = "mvn";

/// Browser passed to the test framework when the request does not pick one.
pub const DEFAULT_BROWSER: &str = "chrome";

/// Whether browsers run headless by default.
pub const DEFAULT_HEADLESS: bool = true;

/// Upper bound for a single test run (30 minutes).
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 30 * 60;

/// Environments accepted by `/env`.
pub const DEFAULT_SUPPORTED_ENVS: &[&str] = &["dev", "replica", "prod"];

// ============================================================================
// Queue Defaults
// ============================================================================

/// Maximum number of runs tracked at once (queued + running).
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 5;

/// Maximum number of runs executing at once.
///
/// Runs share the framework's report directory, so one at a time keeps
/// parsed results attributable to the run that produced them.
pub const DEFAULT_MAX_PARALLEL: usize = 1;

// ============================================================================
// Discovery Defaults
// ============================================================================

/// Test source directory, relative to the framework root.
pub const DEFAULT_TEST_SOURCE_DIR: &str = "src/test/java";

/// Build descriptor listing the profiles, relative to the framework root.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "pom.xml";

/// File name suffix of a runnable test class.
pub const DEFAULT_TEST_FILE_SUFFIX: &str = "Test.java";

/// Class names that are infrastructure, never runnable on their own.
pub const DEFAULT_EXCLUDED_CLASSES: &[&str] = &["BaseTest", "BaseApiTest"];

/// Directory names whose contents are never runnable.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &["base", "dataproviders"];

// ============================================================================
// Report Defaults
// ============================================================================

/// Surefire XML report directory, relative to the framework root.
pub const DEFAULT_SUREFIRE_DIR: &str = "target/surefire-reports";

/// Allure raw results directory, relative to the framework root.
pub const DEFAULT_ALLURE_RESULTS_DIR: &str = "target/allure-results";

/// Allure command line executable.
pub const DEFAULT_ALLURE_COMMAND: &str = "allure";

/// Directory where generated Allure reports are written, one per run.
pub const DEFAULT_ALLURE_OUTPUT_DIR: &str = "allure-reports";

/// Maximum number of failed tests listed in a result message.
pub const DEFAULT_MAX_FAILED_SHOWN: usize = 10;

// ============================================================================
// Logging Defaults
// ============================================================================

/// Log filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_LEVEL: &str = "info";
