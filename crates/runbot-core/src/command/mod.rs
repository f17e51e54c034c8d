//! Chat commands.
//!
//! Every command is one of three variants sharing the same contract
//! (`name`, `description`, `execute`):
//! - [`FixedCommand`]: built in, registered before discovery
//! - [`TestCommand`]: one discovered profile or test class
//! - [`GroupCommand`]: every test class in one directory, with sub-commands

mod fixed;
mod group;
mod registry;
mod test;

pub use fixed::{builtin_commands, FixedAction, FixedCommand};
pub use group::{GroupCommand, SubCommand};
pub use registry::CommandRegistry;
pub use test::TestCommand;

use crate::run::RunServices;

/// Where a command was issued and what it can reach.
pub struct CommandContext<'a> {
    pub chat_id: i64,
    pub user_id: i64,
    pub registry: &'a CommandRegistry,
    pub services: &'a RunServices,
}

#[derive(Debug, Clone)]
pub enum Command {
    Fixed(FixedCommand),
    Single(TestCommand),
    Group(GroupCommand),
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::Fixed(c) => &c.name,
            Command::Single(c) => &c.name,
            Command::Group(c) => c.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Command::Fixed(c) => &c.description,
            Command::Single(c) => &c.description,
            Command::Group(c) => c.description(),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Command::Group(_))
    }

    /// Sub-command names and descriptions, in insertion order.
    pub fn sub_commands(&self) -> Vec<(&str, &str)> {
        match self {
            Command::Group(group) => group
                .subs()
                .iter()
                .map(|sub| (sub.name.as_str(), sub.description.as_str()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Run the command with the raw argument text after the command token.
    pub async fn execute(&self, ctx: &CommandContext<'_>, args: &str) {
        match self {
            Command::Fixed(c) => c.execute(ctx, args).await,
            Command::Single(c) => c.execute(ctx, args).await,
            Command::Group(c) => c.execute(ctx, args).await,
        }
    }
}

impl From<FixedCommand> for Command {
    fn from(command: FixedCommand) -> Self {
        Command::Fixed(command)
    }
}

impl From<TestCommand> for Command {
    fn from(command: TestCommand) -> Self {
        Command::Single(command)
    }
}

impl From<GroupCommand> for Command {
    fn from(command: GroupCommand) -> Self {
        Command::Group(command)
    }
}
