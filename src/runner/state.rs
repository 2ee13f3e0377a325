use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::command::{Command, Screenshot};

/// Failure details carried by [`Outcome::Error`].
///
/// When the failure came from a fault (a handler returning `Err`, a panic, an
/// evaluator error) the original error is kept as the cause so callers can
/// still downcast it.
#[derive(Debug, Clone)]
pub struct Failure {
    message: String,
    cause: Option<Arc<anyhow::Error>>,
}

impl Failure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    pub fn from_cause(cause: anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", cause),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn cause(&self) -> Option<&anyhow::Error> {
        self.cause.as_deref()
    }
}

/// Outcome of one command dispatch.
#[derive(Debug, Clone)]
pub enum Outcome {
    Success,
    Warning(String),
    Error(Failure),
    Aborted,
}

/// Severity order used when folding outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Success,
    Warning,
    Error,
    Aborted,
}

impl Outcome {
    pub fn warning(message: impl Into<String>) -> Self {
        Outcome::Warning(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Outcome::Error(Failure::new(message))
    }

    pub fn from_fault(cause: anyhow::Error) -> Self {
        Outcome::Error(Failure::from_cause(cause))
    }

    /// Success and Warning let the sequence continue without retrying.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success | Outcome::Warning(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Outcome::Aborted)
    }

    pub fn severity(&self) -> Severity {
        match self {
            Outcome::Success => Severity::Success,
            Outcome::Warning(_) => Severity::Warning,
            Outcome::Error(_) => Severity::Error,
            Outcome::Aborted => Severity::Aborted,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Outcome::Warning(message) => Some(message),
            Outcome::Error(failure) => Some(failure.message()),
            Outcome::Success | Outcome::Aborted => None,
        }
    }

    /// Fold outcomes by severity: Aborted > Error > Warning > Success.
    ///
    /// The earliest outcome of the winning severity is returned, so folding is
    /// deterministic for any input order. An empty input folds to Success.
    pub fn fold<'a>(outcomes: impl IntoIterator<Item = &'a Outcome>) -> Outcome {
        let mut folded: Option<&Outcome> = None;
        for outcome in outcomes {
            match folded {
                Some(current) if current.severity() >= outcome.severity() => {}
                _ => folded = Some(outcome),
            }
        }
        folded.cloned().unwrap_or(Outcome::Success)
    }

    pub fn to_report(&self) -> OutcomeReport {
        match self {
            Outcome::Success => OutcomeReport::Success,
            Outcome::Warning(message) => OutcomeReport::Warning {
                message: message.clone(),
            },
            Outcome::Error(failure) => OutcomeReport::Error {
                message: failure.message().to_string(),
            },
            Outcome::Aborted => OutcomeReport::Aborted,
        }
    }
}

impl PartialEq for Outcome {
    fn eq(&self, other: &Self) -> bool {
        self.severity() == other.severity() && self.message() == other.message()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "Success"),
            Outcome::Warning(message) => write!(f, "Warning: {}", message),
            Outcome::Error(failure) => write!(f, "Error: {}", failure.message()),
            Outcome::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Serializable form of [`Outcome`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutcomeReport {
    Success,
    Warning { message: String },
    Error { message: String },
    Aborted,
}

/// Immutable record of one executed command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    sequence: String,
    command: Arc<Command>,
    screenshots: Option<Vec<Screenshot>>,
    outcome: Outcome,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
}

impl CommandResult {
    /// `ended_at` is clamped so a result never ends before it starts, even if
    /// the wall clock stepped backwards.
    pub fn new(
        sequence: String,
        command: Arc<Command>,
        screenshots: Option<Vec<Screenshot>>,
        outcome: Outcome,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sequence,
            command,
            screenshots,
            outcome,
            started_at,
            ended_at: ended_at.max(started_at),
        }
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn command(&self) -> &Arc<Command> {
        &self.command
    }

    pub fn screenshots(&self) -> Option<&[Screenshot]> {
        self.screenshots.as_deref()
    }

    pub fn outcome(&self) -> &Outcome {
        &self.outcome
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> DateTime<Utc> {
        self.ended_at
    }

    pub fn duration_ms(&self) -> u64 {
        (self.ended_at - self.started_at).num_milliseconds().max(0) as u64
    }

    /// Serialize for reporting
    pub fn to_report(&self) -> CommandResultReport {
        CommandResultReport {
            sequence: self.sequence.clone(),
            index: self.command.index(),
            command: self.command.name().to_string(),
            arguments: self.command.arguments().to_vec(),
            label: self.command.label().map(str::to_string),
            outcome: self.outcome.to_report(),
            screenshots: self
                .screenshots
                .iter()
                .flatten()
                .map(|s| s.path.display().to_string())
                .collect(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            duration_ms: self.duration_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResultReport {
    pub sequence: String,
    pub index: usize,
    pub command: String,
    pub arguments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub outcome: OutcomeReport,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub screenshots: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Ordered record of every command executed during a run, nested blocks
/// included.
#[derive(Debug, Clone)]
pub struct CommandResultList {
    results: Vec<CommandResult>,
    created_at: DateTime<Utc>,
}

impl CommandResultList {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn add(&mut self, result: CommandResult) {
        self.results.push(result);
    }

    /// End time of the last result, or the creation time of an empty list.
    /// The engine chains it as the start time of the next result.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.results
            .last()
            .map(|r| r.ended_at)
            .unwrap_or(self.created_at)
    }

    /// Aggregate outcome of every stored result.
    pub fn aggregate(&self) -> Outcome {
        Outcome::fold(self.results.iter().map(|r| &r.outcome))
    }

    /// Aggregate of the results appended at or after `start`.
    pub fn aggregate_since(&self, start: usize) -> Outcome {
        Outcome::fold(self.results.iter().skip(start).map(|r| &r.outcome))
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CommandResult> {
        self.results.iter()
    }

    pub fn get(&self, index: usize) -> Option<&CommandResult> {
        self.results.get(index)
    }

    pub fn to_report(&self) -> Vec<CommandResultReport> {
        self.results.iter().map(|r| r.to_report()).collect()
    }
}

impl Default for CommandResultList {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> IntoIterator for &'a CommandResultList {
    type Item = &'a CommandResult;
    type IntoIter = std::slice::Iter<'a, CommandResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
