//! Turning scan results into registered commands.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::{debug, info, warn};

use super::{DiscoveredUnit, TestSuiteScanner};
use crate::command::{Command, CommandRegistry, GroupCommand, TestCommand};
use crate::config::{DiscoveryConfig, DiscoveryStrategy};

/// One single-unit command per discovered unit.
///
/// When a profile and a class derive the same name the profile wins,
/// wherever it appears in the input. Between two classes the first wins.
pub fn flat_commands(units: Vec<DiscoveredUnit>) -> Vec<Command> {
    let mut kept: Vec<DiscoveredUnit> = Vec::new();
    let mut by_name: HashMap<String, usize> = HashMap::new();

    for unit in units {
        match by_name.get(&unit.command_name) {
            Some(&i) if unit.is_profile() && !kept[i].is_profile() => {
                debug!(command = %unit.command_name, "profile replaces class-derived command");
                kept[i] = unit;
            }
            Some(_) => {
                debug!(command = %unit.command_name, "duplicate command name skipped");
            }
            None => {
                by_name.insert(unit.command_name.clone(), kept.len());
                kept.push(unit);
            }
        }
    }

    kept.iter()
        .filter_map(TestCommand::from_unit)
        .map(Command::from)
        .collect()
}

/// One group command per directory, in directory name order.
pub fn group_commands(groups: BTreeMap<String, Vec<DiscoveredUnit>>) -> Vec<Command> {
    groups
        .into_iter()
        .filter(|(_, units)| !units.is_empty())
        .map(|(name, units)| GroupCommand::new(name, &units))
        .filter(|group| !group.subs().is_empty())
        .map(Command::from)
        .collect()
}

/// Scans a framework checkout and registers the resulting commands.
pub struct DynamicCommandRegistrar {
    scanner: TestSuiteScanner,
    strategy: DiscoveryStrategy,
}

impl DynamicCommandRegistrar {
    pub fn new(scanner: TestSuiteScanner, strategy: DiscoveryStrategy) -> Self {
        Self { scanner, strategy }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(TestSuiteScanner::with_config(config.clone()), config.strategy)
    }

    /// Build commands for the configured strategy.
    pub fn discover(&self, framework_path: &Path) -> Vec<Command> {
        match self.strategy {
            DiscoveryStrategy::Flat => flat_commands(self.scanner.scan(framework_path)),
            DiscoveryStrategy::Grouped => {
                group_commands(self.scanner.scan_grouped(framework_path))
            }
            DiscoveryStrategy::Disabled => Vec::new(),
        }
    }

    /// Register discovered commands, returning how many were accepted.
    ///
    /// Names already in the registry are kept, so built-ins always win.
    pub fn register(&self, registry: &mut CommandRegistry, framework_path: Option<&Path>) -> usize {
        if self.strategy == DiscoveryStrategy::Disabled {
            info!("command discovery disabled");
            return 0;
        }
        let Some(path) = framework_path else {
            warn!("framework path not configured, skipping command discovery");
            return 0;
        };

        let commands = self.discover(path);
        let found = commands.len();
        let registered = commands
            .into_iter()
            .map(|command| registry.register(command))
            .filter(|added| *added)
            .count();

        info!(
            strategy = %self.strategy,
            found,
            registered,
            path = %path.display(),
            "dynamic commands registered"
        );
        registered
    }
}
