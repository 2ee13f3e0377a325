//! Shared fixtures for unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::command::{ArgumentType, Command, CommandHandler, CommandList, Screenshot};
use crate::commands::flow::Label;
use crate::driver::DryRunDriver;
use crate::runner::context::ExecutionContext;
use crate::runner::interactive::Console;
use crate::runner::state::{CommandResultList, Outcome};
use crate::utils::config::Config;

pub static VALUES: [ArgumentType; 4] = [ArgumentType::Value; 4];

/// What a [`Scripted`] handler does on one dispatch.
#[derive(Debug, Clone)]
pub enum Step {
    Return(Outcome),
    Fault(&'static str),
    Panic(&'static str),
}

/// Calls observed by a [`Scripted`] handler.
#[derive(Debug, Clone, Default)]
pub struct Tracker {
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Tracker {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().unwrap().clone()
    }
}

/// Handler that plays back a list of steps; the last step repeats and an
/// empty list always succeeds.
pub struct Scripted {
    kinds: &'static [ArgumentType],
    steps: Vec<Step>,
    capture: bool,
    tracker: Tracker,
}

impl Scripted {
    pub fn new(kinds: &'static [ArgumentType]) -> Self {
        Self {
            kinds,
            steps: Vec::new(),
            capture: false,
            tracker: Tracker::default(),
        }
    }

    /// Handler taking `count` plain value arguments.
    pub fn values(count: usize) -> Self {
        Self::new(&VALUES[..count])
    }

    pub fn steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    /// Record a screenshot on the command at every dispatch.
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

#[async_trait]
impl CommandHandler for Scripted {
    fn argument_types(&self) -> &'static [ArgumentType] {
        self.kinds
    }

    async fn execute(
        &self,
        command: &Command,
        _context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let call = self.tracker.calls.fetch_add(1, Ordering::SeqCst);
        self.tracker.seen.lock().unwrap().push(args.to_vec());
        if self.capture {
            command.add_screenshot(Screenshot::new(format!("{}-{}.png", command.name(), call)));
        }

        let step = self
            .steps
            .get(call)
            .or_else(|| self.steps.last())
            .cloned()
            .unwrap_or(Step::Return(Outcome::Success));
        match step {
            Step::Return(outcome) => Ok(outcome),
            Step::Fault(message) => Err(anyhow!(message)),
            Step::Panic(message) => panic!("{}", message),
        }
    }
}

fn owned(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}

/// Command with one plain value argument per entry of `args`.
pub fn command(name: &str, args: &[&str]) -> Arc<Command> {
    Arc::new(scripted_command(0, name, args, Scripted::values(args.len())))
}

pub fn command_with(name: &str, args: &[&str], kinds: &'static [ArgumentType]) -> Arc<Command> {
    Arc::new(Command::new(0, name, owned(args), Box::new(Scripted::new(kinds))).unwrap())
}

pub fn scripted_command(index: usize, name: &str, args: &[&str], handler: Scripted) -> Command {
    Command::new(index, name, owned(args), Box::new(handler)).unwrap()
}

/// Argument-less command that always succeeds.
pub fn plain(index: usize, name: &str) -> Command {
    scripted_command(index, name, &[], Scripted::values(0))
}

/// `label` command defining `name`.
pub fn label(index: usize, name: &str) -> Command {
    Command::new(index, "label", vec![name.to_string()], Box::new(Label)).unwrap()
}

pub fn list(commands: Vec<Command>) -> Arc<CommandList> {
    let mut list = CommandList::new();
    for command in commands {
        list.add(command);
    }
    Arc::new(list)
}

/// Context with a dry-run driver, no retry delay and a console without input.
pub fn context() -> ExecutionContext {
    let config = Config {
        retry_interval_ms: 0,
        ..Config::default()
    };
    let (console, _) = ScriptedConsole::new(&[]);
    ExecutionContext::new(config, Box::new(DryRunDriver::new())).with_console(Box::new(console))
}

/// Lines written to a [`ScriptedConsole`].
#[derive(Debug, Clone, Default)]
pub struct ConsoleOutput(Arc<Mutex<Vec<String>>>);

impl ConsoleOutput {
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Console fed from a fixed list of input lines.
pub struct ScriptedConsole {
    inputs: Vec<String>,
    output: ConsoleOutput,
}

impl ScriptedConsole {
    pub fn new(inputs: &[&str]) -> (Self, ConsoleOutput) {
        let output = ConsoleOutput::default();
        let mut inputs = owned(inputs);
        inputs.reverse();
        (
            Self {
                inputs,
                output: output.clone(),
            },
            output,
        )
    }
}

impl Console for ScriptedConsole {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.inputs.pop())
    }

    fn write_line(&mut self, line: &str) {
        self.output.0.lock().unwrap().push(line.to_string());
    }
}
