use std::collections::HashMap;

use tracing::{debug, warn};

use super::{builtin_commands, Command};

/// Name-keyed command table.
///
/// Registration is first-write-wins, so commands registered first (the
/// built-ins) are never shadowed by discovered ones. Names are matched
/// case-insensitively.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in commands.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for command in builtin_commands() {
            registry.register(command);
        }
        registry
    }

    /// Insert `command` unless its name is taken. Returns whether it was added.
    pub fn register(&mut self, command: impl Into<Command>) -> bool {
        let command = command.into();
        let key = command.name().to_lowercase();

        if let Some(&existing) = self.index.get(&key) {
            warn!(
                command = %key,
                kept = self.commands[existing].description(),
                rejected = command.description(),
                "command name already registered, keeping the first"
            );
            return false;
        }

        debug!(command = %key, group = command.is_group(), "registered command");
        self.index.insert(key, self.commands.len());
        self.commands.push(command);
        true
    }

    pub fn resolve(&self, name: &str) -> Option<&Command> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.commands[i])
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// (name, description) pairs for a chat client's command menu.
    pub fn menu(&self) -> Vec<(String, String)> {
        self.commands
            .iter()
            .map(|c| (c.name().to_lowercase(), c.description().to_string()))
            .collect()
    }
}
