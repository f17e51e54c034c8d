use chrono::Utc;

use super::test::submit_target;
use super::{Command, CommandContext};
use crate::notify::format_duration;
use crate::run::RunTarget;

/// What a built-in command does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixedAction {
    /// List every registered command.
    Help,
    /// Show or set the session environment.
    Env,
    /// List this chat's active runs.
    Status,
    /// Run a fixed target, the first argument overriding the environment.
    Suite(RunTarget),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedCommand {
    pub name: String,
    pub description: String,
    pub action: FixedAction,
}

impl FixedCommand {
    pub fn new(name: impl Into<String>, description: impl Into<String>, action: FixedAction) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            action,
        }
    }

    pub async fn execute(&self, ctx: &CommandContext<'_>, args: &str) {
        match &self.action {
            FixedAction::Help => {
                let text = help_text(ctx);
                ctx.services.notifier.send(ctx.chat_id, &text).await;
            }
            FixedAction::Env => {
                let text = env_command(ctx, args);
                ctx.services.notifier.send(ctx.chat_id, &text).await;
            }
            FixedAction::Status => {
                let text = status_text(ctx);
                ctx.services.notifier.send(ctx.chat_id, &text).await;
            }
            FixedAction::Suite(target) => {
                submit_target(ctx, &self.name, target.clone(), args.split_whitespace().next())
                    .await;
            }
        }
    }
}

/// Commands registered before discovery.
pub fn builtin_commands() -> Vec<Command> {
    vec![
        FixedCommand::new("start", "Show available commands", FixedAction::Help).into(),
        FixedCommand::new("help", "Show available commands", FixedAction::Help).into(),
        FixedCommand::new("env", "Show, set or reset the target environment", FixedAction::Env).into(),
        FixedCommand::new("status", "Show active runs", FixedAction::Status).into(),
        FixedCommand::new(
            "smoke",
            "Run smoke test suite",
            FixedAction::Suite(RunTarget::Profile("smoke".to_string())),
        )
        .into(),
        FixedCommand::new(
            "regression",
            "Run regression test suite",
            FixedAction::Suite(RunTarget::Profile("regression".to_string())),
        )
        .into(),
    ]
}

fn help_text(ctx: &CommandContext<'_>) -> String {
    let mut text = String::from("🤖 *Available commands*\n");
    for command in ctx.registry.iter() {
        text.push_str(&format!("\n/{} - {}", command.name(), command.description()));
        for (sub, _) in command.sub_commands() {
            text.push_str(&format!("\n    /{} {}", command.name(), sub));
        }
    }

    let env = ctx
        .services
        .resolve_env(ctx.user_id, None)
        .unwrap_or_else(|| "default".to_string());
    text.push_str(&format!(
        "\n\nEnvironment: `{}`\nAppend an environment to any run command, e.g. `/smoke dev`.",
        env
    ));
    text
}

fn env_command(ctx: &CommandContext<'_>, args: &str) -> String {
    let services = ctx.services;
    let Some(requested) = args.split_whitespace().next() else {
        let current = services
            .resolve_env(ctx.user_id, None)
            .unwrap_or_else(|| "default".to_string());
        return format!(
            "🌍 Current environment: `{}`\nSupported: {}",
            current,
            supported_list(&services.defaults.supported_envs)
        );
    };

    let env = requested.to_lowercase();
    if env == "reset" {
        services.sessions.clear(ctx.user_id);
        let fallback = services
            .resolve_env(ctx.user_id, None)
            .unwrap_or_else(|| "default".to_string());
        return format!("🌍 Environment reset to `{}`", fallback);
    }
    if !services.defaults.is_supported_env(&env) {
        return format!(
            "⚠️ Unknown environment `{}`. Supported: {}",
            env,
            supported_list(&services.defaults.supported_envs)
        );
    }

    services.sessions.set_env(ctx.user_id, &env);
    format!("🌍 Environment set to `{}`", env)
}

fn supported_list(envs: &[String]) -> String {
    if envs.is_empty() {
        "any".to_string()
    } else {
        envs.join(", ")
    }
}

fn status_text(ctx: &CommandContext<'_>) -> String {
    let runs = ctx.services.queue.runs_for_chat(ctx.chat_id);
    if runs.is_empty() {
        return "No active runs.".to_string();
    }

    let now = Utc::now();
    let mut text = format!(
        "📋 *Active runs* ({}/{})\n",
        ctx.services.queue.active_count(),
        ctx.services.queue.capacity()
    );
    for info in runs {
        let status = info.status();
        let since = info
            .entered_at(status)
            .unwrap_or(info.request.submitted_at);
        let elapsed = (now - since).to_std().unwrap_or_default();
        text.push_str(&format!(
            "\n{} `{}` {} ({}) {} {}",
            status.icon(),
            info.run_id(),
            info.request.label,
            info.request.env_label(),
            status.label().to_lowercase(),
            format_duration(elapsed)
        ));
    }
    text
}
