use std::collections::HashMap;

use tracing::debug;

use super::test::submit_target;
use super::CommandContext;
use crate::discovery::DiscoveredUnit;
use crate::run::RunTarget;

/// One runnable test class inside a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubCommand {
    pub name: String,
    pub test_class: String,
    pub description: String,
}

/// Every test class in one directory, exposed as a single command.
///
/// `/<group>` runs everything, `/<group> <sub> [env]` runs one class and
/// `/<group> <env>` runs everything against `env`.
#[derive(Debug, Clone)]
pub struct GroupCommand {
    name: String,
    description: String,
    subs: Vec<SubCommand>,
    index: HashMap<String, usize>,
}

impl GroupCommand {
    /// Build a group from discovered class units, keeping their order.
    pub fn new(name: impl Into<String>, units: &[DiscoveredUnit]) -> Self {
        let name = name.into().to_lowercase();
        let mut subs = Vec::new();
        let mut index = HashMap::new();

        for unit in units {
            let Some(test_class) = &unit.test_class else {
                continue;
            };
            if index.contains_key(&unit.command_name) {
                debug!(group = %name, sub_command = %unit.command_name, "duplicate sub-command skipped");
                continue;
            }
            index.insert(unit.command_name.clone(), subs.len());
            subs.push(SubCommand {
                name: unit.command_name.clone(),
                test_class: test_class.clone(),
                description: unit.description.clone(),
            });
        }

        let description = format!("Run all {} tests ({} tests)", name, subs.len());
        Self {
            name,
            description,
            subs,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn subs(&self) -> &[SubCommand] {
        &self.subs
    }

    pub fn sub(&self, name: &str) -> Option<&SubCommand> {
        self.index.get(name).map(|&i| &self.subs[i])
    }

    /// Every sub-command with its description, plus usage.
    pub fn help_text(&self) -> String {
        let mut text = format!("📂 *{}* - Running all tests\n", self.name.to_uppercase());
        for sub in &self.subs {
            text.push_str(&format!("\n  • /{} {} - {}", self.name, sub.name, sub.description));
        }
        text.push_str(&format!("\n\nTip: /{} <name> [env]", self.name));
        text
    }

    pub async fn execute(&self, ctx: &CommandContext<'_>, args: &str) {
        let args = args.trim();

        if args.is_empty() {
            ctx.services.notifier.send(ctx.chat_id, &self.help_text()).await;
            self.run_all(ctx, None).await;
            return;
        }

        let (first, rest) = match args.split_once(char::is_whitespace) {
            Some((first, rest)) => (first, rest.trim()),
            None => (args, ""),
        };
        let first = first.to_lowercase();

        match self.sub(&first) {
            Some(sub) => {
                let env = (!rest.is_empty()).then_some(rest);
                let label = format!("{}/{}", self.name, sub.name);
                submit_target(ctx, &label, RunTarget::Class(sub.test_class.clone()), env).await;
            }
            None => self.run_all(ctx, Some(first.as_str())).await,
        }
    }

    async fn run_all(&self, ctx: &CommandContext<'_>, env: Option<&str>) {
        if self.subs.is_empty() {
            ctx.services
                .notifier
                .send(ctx.chat_id, &format!("No tests found in `{}`", self.name))
                .await;
            return;
        }
        let classes = self.subs.iter().map(|s| s.test_class.clone()).collect();
        let label = format!("{} (all)", self.name);
        submit_target(ctx, &label, RunTarget::Classes(classes), env).await;
    }
}
