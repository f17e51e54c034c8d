use super::CommandContext;
use crate::discovery::DiscoveredUnit;
use crate::run::RunTarget;

/// Runs one profile or one test class.
///
/// The first argument token, when present, overrides the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestCommand {
    pub name: String,
    pub description: String,
    pub target: RunTarget,
}

impl TestCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>, target: RunTarget) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            target,
        }
    }

    pub fn from_unit(unit: &DiscoveredUnit) -> Option<Self> {
        Some(Self::new(
            &unit.command_name,
            &unit.description,
            unit.target()?,
        ))
    }

    pub async fn execute(&self, ctx: &CommandContext<'_>, args: &str) {
        submit_target(ctx, &self.name, self.target.clone(), args.split_whitespace().next()).await;
    }
}

/// Resolve the environment and submit one run.
pub(super) async fn submit_target(
    ctx: &CommandContext<'_>,
    label: &str,
    target: RunTarget,
    explicit_env: Option<&str>,
) {
    let services = ctx.services;
    let env = services.resolve_env(ctx.user_id, explicit_env);
    let request = services.request(ctx.chat_id, ctx.user_id, label, target, env);
    services.submit(request).await;
}
