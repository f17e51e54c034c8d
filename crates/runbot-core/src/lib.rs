pub mod bot;
pub mod command;
pub mod config;
pub mod discovery;
pub mod notify;
pub mod report;
pub mod run;
pub mod session;

pub use bot::{Bot, BotError, IncomingMessage};
pub use command::{Command, CommandContext, CommandRegistry};
pub use config::{Config, ConfigError, DiscoveryStrategy};
pub use discovery::{DiscoveredUnit, DynamicCommandRegistrar, TestSuiteScanner};
pub use notify::{MessageSender, Notifier, NotifyError, TelegramClient};
pub use report::{ReportGenerator, ReportParser, RunReport, TestCase, TestSuite};
pub use run::{
    ExecutionPipeline, RunDefaults, RunInfo, RunOutcome, RunQueue, RunRequest, RunServices,
    RunStatus, RunTarget, TestRunner,
};
pub use session::SessionStore;
