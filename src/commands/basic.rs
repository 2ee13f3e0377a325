use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::time::Duration;

use super::CommandFactory;
use crate::command::{ArgumentType, Command, CommandHandler, COMMENT};
use crate::runner::context::ExecutionContext;
use crate::runner::events::TestEvent;
use crate::runner::state::{CommandResultList, Outcome};

pub(super) fn register(factory: &mut CommandFactory) {
    factory.register(COMMENT, || Box::new(Comment));
    factory.register("echo", || Box::new(Echo));
    factory.register("store", || Box::new(Store));
    factory.register("pause", || Box::new(Pause));
    factory.register("assert", || Box::new(Compare { fatal: true }));
    factory.register("verify", || Box::new(Compare { fatal: false }));
}

/// No-op; `comment breakpoint` is handled by the engine.
pub struct Comment;

#[async_trait]
impl CommandHandler for Comment {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value]
    }

    fn required_arguments(&self) -> usize {
        0
    }

    fn is_retryable(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _command: &Command,
        _context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        _args: &[String],
    ) -> Result<Outcome> {
        Ok(Outcome::Success)
    }
}

/// Print a message to the run log.
pub struct Echo;

#[async_trait]
impl CommandHandler for Echo {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value]
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        log::info!("echo: {}", args[0]);
        context.emit(TestEvent::Log {
            message: args[0].clone(),
            depth: context.nesting(),
        });
        Ok(Outcome::Success)
    }
}

/// `store(value, name)`: bind a variable.
pub struct Store;

#[async_trait]
impl CommandHandler for Store {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value, ArgumentType::Variable]
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let (value, name) = (&args[0], &args[1]);
        if name.is_empty() {
            return Ok(Outcome::error("variable name is empty"));
        }
        log::debug!("store {} = {}", name, value);
        context.vars_mut().set(name.as_str(), value.as_str());
        Ok(Outcome::Success)
    }
}

/// `pause(ms)`: sleep, using the default timeout when no duration is given.
pub struct Pause;

#[async_trait]
impl CommandHandler for Pause {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value]
    }

    fn required_arguments(&self) -> usize {
        0
    }

    fn is_retryable(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let raw = args[0].trim();
        let ms = if raw.is_empty() {
            context.config().default_timeout_ms
        } else {
            raw.parse::<u64>()
                .with_context(|| format!("Invalid pause duration: '{}'", raw))?
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(Outcome::Success)
    }
}

/// `assert(name, expected)` / `verify(name, expected)`: compare a variable.
///
/// A mismatch is an Error for `assert` and a Warning for `verify`.
pub struct Compare {
    fatal: bool,
}

#[async_trait]
impl CommandHandler for Compare {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Variable, ArgumentType::Value]
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let (name, expected) = (&args[0], &args[1]);
        let Some(actual) = context.vars().get(name) else {
            return Ok(Outcome::error(format!("variable '{}' is not set", name)));
        };
        if actual == expected {
            return Ok(Outcome::Success);
        }
        let message = format!(
            "Actual value '{}' did not match '{}' for variable '{}'",
            actual, expected, name
        );
        Ok(if self.fatal {
            Outcome::error(message)
        } else {
            Outcome::warning(message)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::CommandFactory;
    use crate::runner::events::TestEvent;
    use crate::runner::state::{CommandResultList, Outcome};
    use crate::test_support::{context, list};
    use tokio::time::{Duration, Instant};

    fn build(index: usize, name: &str, args: &[&str]) -> crate::command::Command {
        CommandFactory::with_builtins()
            .create(index, name, args.iter().map(|a| a.to_string()).collect())
            .unwrap()
    }

    #[tokio::test]
    async fn test_store_then_echo() {
        let mut ctx = context();
        let mut receiver = ctx.emitter().subscribe();
        let commands = list(vec![
            build(0, "store", &["world", "who"]),
            build(1, "echo", &["hello ${who}"]),
        ]);
        let mut results = CommandResultList::new();
        let outcome = commands.execute(&mut ctx, &mut results).await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(ctx.vars().get("who"), Some("world"));
        let mut logged = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            if let TestEvent::Log { message, depth } = event {
                logged.push((message, depth));
            }
        }
        assert_eq!(logged, vec![("hello world".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_store_to_empty_name_fails() {
        let mut ctx = context();
        let commands = list(vec![build(0, "store", &["x", ""])]);
        let mut results = CommandResultList::new();
        let outcome = commands.execute(&mut ctx, &mut results).await;
        assert_eq!(outcome, Outcome::error("variable name is empty"));
    }

    #[tokio::test]
    async fn test_assert_and_verify() {
        let mut ctx = context();
        ctx.vars_mut().set("title", "Home");
        let commands = list(vec![
            build(0, "assert", &["title", "Home"]),
            build(1, "verify", &["title", "Away"]),
            build(2, "assert", &["title", "Away"]),
            build(3, "verify", &["missing", "x"]),
        ]);
        let mut results = CommandResultList::new();
        commands.execute(&mut ctx, &mut results).await;

        let outcomes: Vec<_> = results.iter().map(|r| r.outcome().clone()).collect();
        assert_eq!(outcomes[0], Outcome::Success);
        assert!(matches!(outcomes[1], Outcome::Warning(_)));
        assert!(outcomes[2].is_error());
        assert_eq!(outcomes[3], Outcome::error("variable 'missing' is not set"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause() {
        let mut ctx = context();
        let commands = list(vec![build(0, "pause", &["1500"])]);
        let mut results = CommandResultList::new();
        let start = Instant::now();
        commands.execute(&mut ctx, &mut results).await;
        assert!(start.elapsed() >= Duration::from_millis(1500));
        assert_eq!(results.aggregate(), Outcome::Success);
    }

    #[tokio::test]
    async fn test_pause_rejects_garbage() {
        let mut ctx = context();
        ctx.config_mut().max_retries = 3;
        let commands = list(vec![build(0, "pause", &["soon"])]);
        let mut results = CommandResultList::new();
        let outcome = commands.execute(&mut ctx, &mut results).await;
        assert_eq!(outcome.message(), Some("Invalid pause duration: 'soon': invalid digit found in string"));
    }
}
