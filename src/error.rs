use thiserror::Error;

/// Structural errors raised while building or walking command lists.
///
/// Failures of an individual command are not errors at this level: they are
/// recorded as [`Outcome::Error`](crate::runner::state::Outcome) results.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No handler is registered under the given command name.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The raw argument count does not match the handler's declared kinds.
    #[error("command '{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// A block body was supplied for a command that does not own one, or
    /// a block command was created without a body.
    #[error("command '{0}' {1}")]
    Block(String, &'static str),

    /// A jump referenced a label or command absent from the current list.
    #[error("jump target not found: {0}")]
    UnknownJumpTarget(String),

    /// A command tried to reach the active iterator outside of `execute`.
    #[error("no command list is currently executing")]
    NoActiveIterator,
}
