use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::iterator::CommandListIterator;
use super::Command;

/// Lookup key for [`CommandList::index_of`]: a label, or a command identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Label(String),
    Command {
        index: usize,
        name: String,
        label: Option<String>,
    },
}

impl From<&str> for IndexKey {
    fn from(label: &str) -> Self {
        IndexKey::Label(label.to_string())
    }
}

impl From<String> for IndexKey {
    fn from(label: String) -> Self {
        IndexKey::Label(label)
    }
}

impl From<&Command> for IndexKey {
    fn from(command: &Command) -> Self {
        IndexKey::Command {
            index: command.index(),
            name: command.name().to_string(),
            label: command.label().map(str::to_string),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexKey::Label(label) => write!(f, "label '{}'", label),
            IndexKey::Command { index, name, .. } => write!(f, "command #{} '{}'", index, name),
        }
    }
}

impl IndexKey {
    fn matches(&self, command: &Command) -> bool {
        match self {
            IndexKey::Label(label) => command.label() == Some(label.as_str()),
            IndexKey::Command { index, name, label } => {
                command.index() == *index
                    && command.name() == name
                    && command.label() == label.as_deref()
            }
        }
    }
}

/// Ordered list of commands with a label index for jumps.
///
/// Labels are registered as commands are appended. Any other lookup is
/// resolved by a linear scan once and memoized, misses included, so repeated
/// lookups never rescan. The list is read-only while it executes.
#[derive(Default)]
pub struct CommandList {
    commands: Vec<Arc<Command>>,
    index_cache: Mutex<HashMap<IndexKey, Option<usize>>>,
    scans: AtomicUsize,
}

impl CommandList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Append a command. Duplicates are allowed, so this always returns true.
    pub fn add(&mut self, command: Command) -> bool {
        let position = self.commands.len();
        let cache = self
            .index_cache
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // The list grew, so a remembered miss may now be a hit.
        cache.retain(|_, index| index.is_some());
        if let Some(label) = command.label() {
            cache.insert(IndexKey::Label(label.to_string()), Some(position));
        }
        self.commands.push(Arc::new(command));
        true
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Command>> {
        self.commands.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Command>> {
        self.commands.iter()
    }

    /// Position of a label or command, `None` when absent.
    pub fn index_of(&self, key: impl Into<IndexKey>) -> Option<usize> {
        let key = key.into();
        let mut cache = self
            .index_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(index) = cache.get(&key) {
            return *index;
        }
        let index = self.scan(&key);
        cache.insert(key, index);
        index
    }

    /// Number of linear scans performed by [`index_of`](Self::index_of).
    pub fn scan_count(&self) -> usize {
        self.scans.load(Ordering::Relaxed)
    }

    fn scan(&self, key: &IndexKey) -> Option<usize> {
        self.scans.fetch_add(1, Ordering::Relaxed);
        self.commands.iter().position(|command| key.matches(command))
    }

    /// Create a cursor over this list, nested under `parent` when given.
    pub fn iterator(
        self: &Arc<Self>,
        parent: Option<&CommandListIterator>,
    ) -> CommandListIterator {
        CommandListIterator::new(Arc::clone(self), parent)
    }
}

impl fmt::Debug for CommandList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.commands.iter()).finish()
    }
}

impl<'a> IntoIterator for &'a CommandList {
    type Item = &'a Arc<Command>;
    type IntoIter = std::slice::Iter<'a, Arc<Command>>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{label, plain};

    fn sample() -> CommandList {
        let mut list = CommandList::new();
        list.add(plain(0, "A"));
        list.add(label(1, "L"));
        list.add(plain(2, "C"));
        list
    }

    #[test]
    fn test_label_lookup() {
        let list = sample();
        assert_eq!(list.index_of("L"), Some(1));
        assert_eq!(list.scan_count(), 0);
    }

    #[test]
    fn test_missing_label_is_memoized() {
        let list = sample();
        assert_eq!(list.index_of("nowhere"), None);
        assert_eq!(list.scan_count(), 1);
        assert_eq!(list.index_of("nowhere"), None);
        assert_eq!(list.index_of("nowhere"), None);
        assert_eq!(list.scan_count(), 1);
    }

    #[test]
    fn test_command_lookup_is_memoized() {
        let list = sample();
        let target = Arc::clone(list.get(2).unwrap());
        assert_eq!(list.index_of(target.as_ref()), Some(2));
        assert_eq!(list.index_of(target.as_ref()), Some(2));
        assert_eq!(list.scan_count(), 1);
    }

    #[test]
    fn test_append_then_lookup_returns_position() {
        let mut list = sample();
        assert!(list.add(label(3, "end")));
        assert_eq!(list.index_of("end"), Some(3));
    }

    #[test]
    fn test_append_invalidates_remembered_miss() {
        let mut list = sample();
        let later = plain(7, "D");
        assert_eq!(list.index_of(&later), None);
        list.add(later);
        let appended = Arc::clone(list.get(3).unwrap());
        assert_eq!(list.index_of(appended.as_ref()), Some(3));
    }

    #[test]
    fn test_duplicates_are_appended() {
        let mut list = CommandList::new();
        assert!(list.add(plain(0, "A")));
        assert!(list.add(plain(0, "A")));
        assert_eq!(list.len(), 2);
    }
}
