mod common;

use std::sync::Arc;

use runbot_core::command::GroupCommand;
use runbot_core::{Bot, CommandRegistry, DiscoveredUnit, IncomingMessage, RunTarget};

use common::{harness, wait_idle, Harness, Script, ScriptedRunner};

const CHAT: i64 = -100;
const USER: i64 = 7;

fn auth_group() -> GroupCommand {
    GroupCommand::new(
        "auth",
        &[
            DiscoveredUnit::from_test_class("LoginTest"),
            DiscoveredUnit::from_test_class("LogoutTest"),
        ],
    )
}

fn bot(h: &Harness) -> Bot {
    let mut registry = CommandRegistry::with_builtins();
    registry.register(auth_group());
    Bot::new(Arc::new(registry), h.services.clone())
}

async fn send(bot: &Bot, h: &Harness, text: &str) {
    bot.handle(IncomingMessage::new(CHAT, USER, text)).await;
    wait_idle(&h.services.queue).await;
}

#[tokio::test]
async fn test_blank_args_show_help_and_run_all_with_session_env() {
    let h = harness(ScriptedRunner::new(Script::Pass), 5, 1);
    h.services.sessions.set_env(USER, "replica");
    let bot = bot(&h);

    send(&bot, &h, "/auth").await;

    let texts = h.sender.texts();
    assert!(texts[0].starts_with("📂 *AUTH* - Running all tests"));
    assert!(texts[0].contains("/auth login"));

    let requests = h.runner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].target,
        RunTarget::Classes(vec!["LoginTest".into(), "LogoutTest".into()])
    );
    assert_eq!(requests[0].env.as_deref(), Some("replica"));
    assert_eq!(requests[0].label, "auth (all)");
}

#[tokio::test]
async fn test_sub_command_uses_session_env() {
    let h = harness(ScriptedRunner::new(Script::Pass), 5, 1);
    h.services.sessions.set_env(USER, "replica");
    let bot = bot(&h);

    send(&bot, &h, "/auth login").await;

    let requests = h.runner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target, RunTarget::Class("LoginTest".into()));
    assert_eq!(requests[0].env.as_deref(), Some("replica"));
    assert_eq!(requests[0].label, "auth/login");
}

#[tokio::test]
async fn test_sub_command_with_explicit_env() {
    let h = harness(ScriptedRunner::new(Script::Pass), 5, 1);
    h.services.sessions.set_env(USER, "replica");
    let bot = bot(&h);

    send(&bot, &h, "/auth LOGIN Dev").await;

    let requests = h.runner.requests();
    assert_eq!(requests[0].target, RunTarget::Class("LoginTest".into()));
    assert_eq!(requests[0].env.as_deref(), Some("dev"));
}

#[tokio::test]
async fn test_sub_command_env_is_the_whole_remainder() {
    let h = harness(ScriptedRunner::new(Script::Pass), 5, 1);
    let bot = bot(&h);

    send(&bot, &h, "/auth login  Staging EU ").await;

    let requests = h.runner.requests();
    assert_eq!(requests[0].target, RunTarget::Class("LoginTest".into()));
    assert_eq!(requests[0].env.as_deref(), Some("staging eu"));
}

#[tokio::test]
async fn test_unknown_first_token_is_env_for_run_all() {
    let h = harness(ScriptedRunner::new(Script::Pass), 5, 1);
    let bot = bot(&h);

    send(&bot, &h, "/auth dev").await;

    let requests = h.runner.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].target.joined(), "LoginTest,LogoutTest");
    assert_eq!(requests[0].env.as_deref(), Some("dev"));
    // no help text on this path
    assert!(!h.sender.texts().iter().any(|t| t.starts_with("📂")));
}

#[tokio::test]
async fn test_no_env_anywhere_leaves_env_unset() {
    let h = harness(ScriptedRunner::new(Script::Pass), 5, 1);
    let bot = bot(&h);

    send(&bot, &h, "/auth logout").await;

    let requests = h.runner.requests();
    assert_eq!(requests[0].target, RunTarget::Class("LogoutTest".into()));
    assert_eq!(requests[0].env, None);
}
