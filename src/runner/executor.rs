//! The command execution loop.
//!
//! [`CommandList::execute`] walks a list with a fresh cursor pushed on the
//! context's iterator stack. For every command it resolves the arguments,
//! optionally waits for the operator, dispatches with bounded retry, paces the
//! run and appends a [`CommandResult`].

use anyhow::{anyhow, Context as _, Result};
use chrono::Utc;
use futures::FutureExt;
use regex::Regex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, LazyLock};

use super::context::ExecutionContext;
use super::events::{sequence_depth, TestEvent};
use super::interactive;
use super::state::{CommandResult, CommandResultList, Outcome};
use crate::command::{Command, CommandList};

static JS_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^javascript\{(.*)\}$").expect("script block pattern"));

impl CommandList {
    /// Execute every command of this list, appending one result per executed
    /// command to `results`, and return the aggregate outcome of `results`.
    ///
    /// A command that fails, returns an error or panics only produces an
    /// Error result; the loop carries on with the next command. An Aborted
    /// outcome stops this list. The cursor pushed for this call is popped on
    /// every exit path, unwinding included.
    pub async fn execute(
        self: &Arc<Self>,
        context: &mut ExecutionContext,
        results: &mut CommandResultList,
    ) -> Outcome {
        let iterator = self.iterator(context.current_iterator());
        let depth = context.push_iterator(iterator);

        let run = AssertUnwindSafe(run_commands(context, results))
            .catch_unwind()
            .await;
        context.pop_iterators_to(depth);
        if let Err(panic) = run {
            std::panic::resume_unwind(panic);
        }

        results.aggregate()
    }

    /// Execute this list repeatedly while `condition` holds, returning the
    /// aggregate of the results appended by this call.
    ///
    /// All passes share one cursor, so step sequences keep increasing across
    /// passes. Stops early when a pass aborts, and fails once the configured
    /// iteration cap is exceeded.
    pub async fn execute_loop(
        self: &Arc<Self>,
        context: &mut ExecutionContext,
        results: &mut CommandResultList,
        condition: &(dyn Fn(&ExecutionContext) -> Result<bool> + Sync),
    ) -> Result<Outcome> {
        let start = results.len();
        let iterator = self.iterator(context.current_iterator());
        let depth = context.push_iterator(iterator);

        let run = AssertUnwindSafe(async {
            let max_iterations = context.config().max_loop_iterations;
            let mut iterations = 0;
            while condition(context)? {
                if iterations >= max_iterations {
                    anyhow::bail!("loop exceeded {} iterations", max_iterations);
                }
                iterations += 1;
                context.current_iterator_mut()?.rewind();
                run_commands(context, results).await;
                if results.aggregate_since(start).is_aborted() {
                    break;
                }
            }
            log::debug!("loop finished after {} iteration(s)", iterations);
            Ok::<_, anyhow::Error>(results.aggregate_since(start))
        })
        .catch_unwind()
        .await;
        context.pop_iterators_to(depth);
        match run {
            Ok(outcome) => outcome,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

async fn run_commands(context: &mut ExecutionContext, results: &mut CommandResultList) {
    let mut continued = true;
    while continued {
        let Ok(iterator) = context.current_iterator_mut() else {
            break;
        };
        let Some(mut command) = iterator.next() else {
            break;
        };
        iterator.sequence_mut().increment();
        let sequence = iterator.sequence().to_string();
        let depth = sequence_depth(&sequence);

        log::debug!("[{}] {}", sequence, command);
        context.emit(TestEvent::CommandStarted {
            sequence: sequence.clone(),
            command: command.to_string(),
            depth,
        });

        let mut baseline = command.screenshot_count();
        let outcome = match prepare_arguments(context, &command) {
            Ok(args) => {
                dispatch_with_retry(context, results, &mut command, args, &mut baseline, &sequence)
                    .await
            }
            Err(fault) => {
                log::warn!("[{}] argument evaluation failed: {:#}", sequence, fault);
                Outcome::from_fault(fault)
            }
        };

        if outcome.is_aborted() {
            continued = false;
        } else {
            context.wait_speed().await;
        }

        let screenshots = command.screenshots_since(baseline);
        let result = CommandResult::new(
            sequence.clone(),
            Arc::clone(&command),
            screenshots,
            outcome,
            results.end_time(),
            Utc::now(),
        );

        if !result.outcome().is_success() {
            log::warn!("[{}] {} -> {}", sequence, command, result.outcome());
        }
        context.emit(TestEvent::CommandFinished {
            sequence,
            command: command.to_string(),
            outcome: result.outcome().to_report(),
            duration_ms: result.duration_ms(),
            depth,
        });
        results.add(result);
    }
}

/// Dispatch until the outcome is successful or aborted, the command refuses
/// retries, or the retry cap is reached.
async fn dispatch_with_retry(
    context: &mut ExecutionContext,
    results: &mut CommandResultList,
    command: &mut Arc<Command>,
    mut args: Vec<String>,
    baseline: &mut usize,
    sequence: &str,
) -> Outcome {
    context.reset_retries();
    loop {
        if command.is_breakpoint() {
            context.set_interactive(true);
        }
        if context.is_interactive() {
            let previous = Arc::clone(command);
            let suspended = interactive::suspend(context, command, &mut args);
            if !Arc::ptr_eq(&previous, command) {
                *baseline = command.screenshot_count();
                context.reset_retries();
            }
            if let Err(fault) = suspended {
                log::warn!("[{}] argument evaluation failed: {:#}", sequence, fault);
                return Outcome::from_fault(fault);
            }
        }

        let outcome = dispatch(context, results, command, &args).await;
        if outcome.is_success()
            || outcome.is_aborted()
            || !command.is_retryable()
            || context.has_reached_max_retries()
        {
            return outcome;
        }

        context.increment_retries();
        log::info!(
            "[{}] {} failed ({}), retry {}/{}",
            sequence,
            command.name(),
            outcome,
            context.retries(),
            context.config().max_retries
        );
        context.emit(TestEvent::CommandRetrying {
            sequence: sequence.to_string(),
            attempt: context.retries(),
            max_attempts: context.config().max_retries,
            depth: sequence_depth(sequence),
        });
        context.wait_retry().await;
    }
}

/// Run one attempt, turning an `Err` or a panic into an Error outcome.
async fn dispatch(
    context: &mut ExecutionContext,
    results: &mut CommandResultList,
    command: &Command,
    args: &[String],
) -> Outcome {
    match AssertUnwindSafe(command.dispatch(context, results, args))
        .catch_unwind()
        .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(fault)) => Outcome::from_fault(fault),
        Err(panic) => Outcome::from_fault(anyhow!(
            "command '{}' panicked: {}",
            command.name(),
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Resolve variables in the raw arguments of `command`, then replace each
/// argument of the form `javascript{...}` with its evaluated value.
pub(crate) fn prepare_arguments(
    context: &ExecutionContext,
    command: &Command,
) -> Result<Vec<String>> {
    let mut args = context.resolve_arguments(command);
    for arg in args.iter_mut() {
        let expression = match JS_BLOCK_RE.captures(arg) {
            Some(caps) => caps[1].to_string(),
            None => continue,
        };
        let value = context
            .evaluate(&expression)
            .with_context(|| format!("Failed to evaluate {}", arg))?;
        *arg = value.unwrap_or_default();
    }
    Ok(args)
}
