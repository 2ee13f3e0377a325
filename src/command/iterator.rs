use std::fmt;
use std::sync::Arc;

use super::list::{CommandList, IndexKey};
use super::Command;
use crate::error::EngineError;

/// Step counter rendered as a dotted path, e.g. `3.2.1`.
///
/// The prefix is the parent iterator's path at the moment the child was
/// created; the parent cannot advance while its child runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSequence {
    prefix: Option<String>,
    count: u32,
}

impl CommandSequence {
    pub fn new(parent: Option<&CommandSequence>) -> Self {
        Self {
            prefix: parent.map(|p| p.to_string()),
            count: 0,
        }
    }

    /// Called once per executed command, not per cursor move.
    pub fn increment(&mut self) {
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl fmt::Display for CommandSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}.{}", prefix, self.count),
            None => write!(f, "{}", self.count),
        }
    }
}

/// Bidirectional cursor over a [`CommandList`].
///
/// The cursor sits between elements: `next()` returns the command at the
/// cursor and moves past it, `previous()` moves back and returns the command
/// it crossed.
#[derive(Debug)]
pub struct CommandListIterator {
    list: Arc<CommandList>,
    cursor: usize,
    current: Option<usize>,
    sequence: CommandSequence,
}

impl CommandListIterator {
    pub fn new(list: Arc<CommandList>, parent: Option<&CommandListIterator>) -> Self {
        Self {
            list,
            cursor: 0,
            current: None,
            sequence: CommandSequence::new(parent.map(|p| &p.sequence)),
        }
    }

    pub fn list(&self) -> &Arc<CommandList> {
        &self.list
    }

    pub fn has_next(&self) -> bool {
        self.cursor < self.list.len()
    }

    pub fn has_previous(&self) -> bool {
        self.cursor > 0
    }

    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Arc<Command>> {
        let command = self.list.get(self.cursor).cloned()?;
        self.current = Some(self.cursor);
        self.cursor += 1;
        Some(command)
    }

    pub fn previous(&mut self) -> Option<Arc<Command>> {
        let index = self.cursor.checked_sub(1)?;
        let command = self.list.get(index).cloned()?;
        self.cursor = index;
        self.current = Some(index);
        Some(command)
    }

    /// Make the command before the current one current, leaving the cursor
    /// just past it. `None` at the first command, where nothing moves.
    pub fn step_back(&mut self) -> Option<Arc<Command>> {
        let index = self.current?.checked_sub(1)?;
        let command = self.list.get(index).cloned()?;
        self.current = Some(index);
        self.cursor = index + 1;
        Some(command)
    }

    /// Reposition so that the next call to `next()` yields the target.
    pub fn jump_to(&mut self, key: impl Into<IndexKey>) -> Result<(), EngineError> {
        let key = key.into();
        match self.list.index_of(key.clone()) {
            Some(index) => {
                log::debug!("jump to {} at position {}", key, index);
                self.cursor = index;
                Ok(())
            }
            None => Err(EngineError::UnknownJumpTarget(key.to_string())),
        }
    }

    /// Move the cursor back to the first command, keeping the step sequence.
    pub fn rewind(&mut self) {
        self.cursor = 0;
        self.current = None;
    }

    /// Position of the command most recently returned by `next`/`previous`.
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn sequence(&self) -> &CommandSequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut CommandSequence {
        &mut self.sequence
    }
}
