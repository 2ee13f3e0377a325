//! Commands and the containers that sequence them.
//!
//! A [`Command`] is one instruction of a test script: a name, its raw
//! arguments, and the handler that knows how to run it. Handlers are looked up
//! once, when the command is built, so the engine never inspects names while
//! dispatching.

pub mod iterator;
pub mod list;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use crate::error::EngineError;
use crate::runner::context::ExecutionContext;
use crate::runner::state::{CommandResultList, Outcome};

pub use iterator::{CommandListIterator, CommandSequence};
pub use list::{CommandList, IndexKey};

/// Name of the no-op command that doubles as a breakpoint marker.
pub const COMMENT: &str = "comment";

/// First argument of a `comment` that switches the run to interactive mode.
pub const BREAKPOINT: &str = "breakpoint";

/// How a raw argument is resolved before dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ArgumentType {
    /// Plain text value, `${var}` references substituted.
    Value,
    /// Element locator, `${var}` references substituted.
    Locator,
    /// CSS locator, `${var}` references substituted.
    CssLocator,
    /// Script source; substituted values are quoted for SIDE sources.
    Script,
    /// Variable name, passed through untouched.
    Variable,
}

/// Captured screenshot artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Screenshot {
    pub path: PathBuf,
    pub captured_at: DateTime<Utc>,
}

impl Screenshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            captured_at: Utc::now(),
        }
    }
}

/// Behaviour behind a command name.
///
/// Implementations should prefer returning structured [`Outcome`]s; an `Err`
/// (or a panic) is converted to [`Outcome::Error`] by the engine with the
/// fault kept as its cause.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Kinds of the raw arguments, one per argument.
    fn argument_types(&self) -> &'static [ArgumentType];

    /// Leading arguments that must be given; the rest default to empty.
    fn required_arguments(&self) -> usize {
        self.argument_types().len()
    }

    /// Label this command defines, if it is a jump target.
    fn label(&self, _args: &[String]) -> Option<String> {
        None
    }

    /// Whether a failed dispatch may be repeated.
    fn is_retryable(&self) -> bool {
        true
    }

    async fn execute(
        &self,
        command: &Command,
        context: &mut ExecutionContext,
        results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome>;
}

/// One executable instruction of a test script.
pub struct Command {
    index: usize,
    name: String,
    args: Vec<String>,
    label: Option<String>,
    handler: Box<dyn CommandHandler>,
    screenshots: Mutex<Vec<Screenshot>>,
}

impl Command {
    /// Build a command, checking the argument count against the handler's
    /// declared kinds. Omitted optional arguments are filled with `""`.
    pub fn new(
        index: usize,
        name: impl Into<String>,
        mut args: Vec<String>,
        handler: Box<dyn CommandHandler>,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        let expected = handler.argument_types().len();
        if args.len() > expected || args.len() < handler.required_arguments().min(expected) {
            return Err(EngineError::Arity {
                name,
                expected,
                actual: args.len(),
            });
        }
        args.resize(expected, String::new());
        let label = handler.label(&args);
        Ok(Self {
            index,
            name,
            args,
            label,
            handler,
            screenshots: Mutex::new(Vec::new()),
        })
    }

    /// Position of the command in its source script.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw, unresolved arguments.
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn argument_types(&self) -> &'static [ArgumentType] {
        self.handler.argument_types()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.handler.is_retryable()
    }

    /// `comment breakpoint` turns interactive mode on.
    pub fn is_breakpoint(&self) -> bool {
        self.name == COMMENT && self.args.first().map(String::as_str) == Some(BREAKPOINT)
    }

    /// Run the handler with already-resolved arguments.
    pub async fn dispatch(
        &self,
        context: &mut ExecutionContext,
        results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        self.handler.execute(self, context, results, args).await
    }

    pub fn add_screenshot(&self, screenshot: Screenshot) {
        self.lock_screenshots().push(screenshot);
    }

    pub fn screenshot_count(&self) -> usize {
        self.lock_screenshots().len()
    }

    /// Screenshots appended after the first `baseline` ones, or `None` when
    /// nothing new was captured.
    pub fn screenshots_since(&self, baseline: usize) -> Option<Vec<Screenshot>> {
        let screenshots = self.lock_screenshots();
        if screenshots.len() <= baseline {
            None
        } else {
            Some(screenshots[baseline..].to_vec())
        }
    }

    fn lock_screenshots(&self) -> MutexGuard<'_, Vec<Screenshot>> {
        // A handler that panicked mid-push leaves the list itself intact.
        self.screenshots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.name == other.name && self.label == other.label
    }
}

impl Eq for Command {}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("args", &self.args)
            .field("label", &self.label)
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.args.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandFactory;
    use crate::test_support::{command, Scripted};

    #[test]
    fn test_arity_is_checked() {
        let err = Command::new(
            0,
            "echo",
            vec!["a".into(), "b".into()],
            Box::new(Scripted::new(&[ArgumentType::Value])),
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Arity {
                name: "echo".into(),
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_optional_arguments_default_to_empty() {
        let cmd = CommandFactory::with_builtins()
            .create(0, "comment", Vec::new())
            .unwrap();
        assert_eq!(cmd.arguments(), [String::new()]);
        assert_eq!(cmd.to_string(), "comment []");
        assert!(!cmd.is_breakpoint());

        let err = CommandFactory::with_builtins()
            .create(1, "store", vec!["only-one".into()])
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Arity {
                name: "store".into(),
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_breakpoint_detection() {
        assert!(command("comment", &["breakpoint"]).is_breakpoint());
        assert!(!command("comment", &["note"]).is_breakpoint());
        assert!(!command("echo", &["breakpoint"]).is_breakpoint());
    }

    #[test]
    fn test_screenshot_delta() {
        let cmd = command("echo", &["x"]);
        cmd.add_screenshot(Screenshot::new("before.png"));
        let baseline = cmd.screenshot_count();
        assert!(cmd.screenshots_since(baseline).is_none());

        cmd.add_screenshot(Screenshot::new("a.png"));
        cmd.add_screenshot(Screenshot::new("b.png"));
        let delta = cmd.screenshots_since(baseline).unwrap();
        let paths: Vec<_> = delta.iter().map(|s| s.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a.png"), PathBuf::from("b.png")]);
    }

    #[test]
    fn test_display() {
        assert_eq!(command("echo", &["hi"]).to_string(), "echo [hi]");
    }
}
