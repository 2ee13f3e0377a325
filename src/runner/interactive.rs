//! Operator-driven single stepping
//!
//! When the run is interactive, the engine stops before every dispatch
//! attempt and waits for a line on the console:
//!
//! | input            | effect                                        |
//! |------------------|-----------------------------------------------|
//! | empty / space    | run the command                               |
//! | `c`              | leave interactive mode and run the command    |
//! | `<`              | select the previous command, prompt again     |
//! | `>`              | select the next command, prompt again         |
//!
//! End of input behaves like `c`.

use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use super::context::ExecutionContext;
use super::events::TestEvent;
use super::executor::prepare_arguments;
use crate::command::Command;

/// Line-oriented operator console
pub trait Console: Send + Sync {
    /// Next input line without its line terminator, `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    fn write_line(&mut self, line: &str);
}

/// Console bound to the process's stdin and stdout
#[derive(Debug, Default)]
pub struct StdConsole;

impl StdConsole {
    pub fn new() -> Self {
        Self
    }
}

impl Console for StdConsole {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn write_line(&mut self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}

/// Operator's answer to the interactive prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorInput {
    Proceed,
    ExitInteractive,
    StepBack,
    StepForward,
    Unrecognized,
}

impl OperatorInput {
    pub fn parse(line: &str) -> Self {
        match line {
            "" | " " => OperatorInput::Proceed,
            "c" => OperatorInput::ExitInteractive,
            "<" => OperatorInput::StepBack,
            ">" => OperatorInput::StepForward,
            _ => OperatorInput::Unrecognized,
        }
    }
}

/// Block until the operator lets the current command run.
///
/// Stepping replaces `command` with the newly selected command before its
/// arguments are resolved into `args`, so a resolution fault belongs to the
/// selected command.
pub(crate) fn suspend(
    context: &mut ExecutionContext,
    command: &mut Arc<Command>,
    args: &mut Vec<String>,
) -> Result<()> {
    loop {
        context.emit(TestEvent::Interactive {
            command: command.to_string(),
        });

        let console = context.console_mut();
        console.write_line(&format!("{}", ">>>>>Interactive mode<<<<<".yellow().bold()));
        console.write_line(&format!("Current command: {}", command));
        console.write_line(
            "Input <space> or <return> to run. Input c to exit interactive mode. \
             Input < to previous command. Input > to next command.",
        );

        let input = match console.read_line()? {
            Some(line) => OperatorInput::parse(&line),
            None => {
                log::debug!("console closed, leaving interactive mode");
                OperatorInput::ExitInteractive
            }
        };

        let selected = match input {
            OperatorInput::Proceed => return Ok(()),
            OperatorInput::ExitInteractive => {
                context.set_interactive(false);
                return Ok(());
            }
            OperatorInput::StepBack => context.current_iterator_mut()?.step_back(),
            OperatorInput::StepForward => {
                let iterator = context.current_iterator_mut()?;
                if iterator.has_next() {
                    iterator.next()
                } else {
                    None
                }
            }
            OperatorInput::Unrecognized => None,
        };

        if let Some(next) = selected {
            *command = next;
            *args = prepare_arguments(context, command)?;
        }
    }
}
