//! Built-in command catalog.
//!
//! Handlers are registered by name in a [`CommandFactory`]; script loaders ask
//! the factory to build each [`Command`] so the handler is resolved once.

pub mod basic;
pub mod browser;
pub mod flow;

use std::collections::HashMap;
use std::sync::Arc;

use crate::command::{Command, CommandHandler, CommandList};
use crate::error::EngineError;

/// Builds the handler of a plain command.
pub type HandlerConstructor = fn() -> Box<dyn CommandHandler>;

/// Builds the handler of a block command around its body.
pub type BlockConstructor = fn(Arc<CommandList>) -> Box<dyn CommandHandler>;

/// Registry mapping command names to handler constructors
pub struct CommandFactory {
    handlers: HashMap<String, HandlerConstructor>,
    blocks: HashMap<String, BlockConstructor>,
}

impl CommandFactory {
    /// Factory without any command.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
            blocks: HashMap::new(),
        }
    }

    /// Factory holding every built-in command.
    pub fn with_builtins() -> Self {
        let mut factory = Self::empty();
        basic::register(&mut factory);
        flow::register(&mut factory);
        browser::register(&mut factory);
        factory
    }

    /// Register (or replace) a plain command.
    pub fn register(&mut self, name: &str, constructor: HandlerConstructor) {
        self.blocks.remove(name);
        self.handlers.insert(name.to_string(), constructor);
    }

    /// Register (or replace) a block command.
    pub fn register_block(&mut self, name: &str, constructor: BlockConstructor) {
        self.handlers.remove(name);
        self.blocks.insert(name.to_string(), constructor);
    }

    pub fn is_block(&self, name: &str) -> bool {
        self.blocks.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .handlers
            .keys()
            .chain(self.blocks.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    pub fn create(
        &self,
        index: usize,
        name: &str,
        args: Vec<String>,
    ) -> Result<Command, EngineError> {
        match self.handlers.get(name) {
            Some(constructor) => Command::new(index, name, args, constructor()),
            None if self.is_block(name) => Err(EngineError::Block(name.to_string(), "requires a body")),
            None => Err(EngineError::UnknownCommand(name.to_string())),
        }
    }

    pub fn create_block(
        &self,
        index: usize,
        name: &str,
        args: Vec<String>,
        body: CommandList,
    ) -> Result<Command, EngineError> {
        match self.blocks.get(name) {
            Some(constructor) => Command::new(index, name, args, constructor(Arc::new(body))),
            None if self.handlers.contains_key(name) => {
                Err(EngineError::Block(name.to_string(), "does not take a body"))
            }
            None => Err(EngineError::UnknownCommand(name.to_string())),
        }
    }
}

impl Default for CommandFactory {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Scripted;

    #[test]
    fn test_builtin_names() {
        let factory = CommandFactory::with_builtins();
        let names = factory.names();
        for name in ["comment", "echo", "store", "label", "gotoIf", "if", "while", "allowNativeXpath"] {
            assert!(names.contains(&name), "missing {}", name);
        }
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_unknown_command() {
        let factory = CommandFactory::with_builtins();
        let err = factory.create(0, "open", vec!["/".into()]).unwrap_err();
        assert_eq!(err, EngineError::UnknownCommand("open".into()));
    }

    #[test]
    fn test_block_and_plain_are_not_interchangeable() {
        let factory = CommandFactory::with_builtins();
        assert_eq!(
            factory.create(0, "if", vec!["true".into()]).unwrap_err(),
            EngineError::Block("if".into(), "requires a body")
        );
        assert_eq!(
            factory
                .create_block(0, "echo", vec!["x".into()], CommandList::new())
                .unwrap_err(),
            EngineError::Block("echo".into(), "does not take a body")
        );
    }

    #[test]
    fn test_register_custom_command() {
        let mut factory = CommandFactory::empty();
        factory.register("noop", || Box::new(Scripted::values(0)));
        let command = factory.create(4, "noop", Vec::new()).unwrap();
        assert_eq!(command.index(), 4);
        assert_eq!(factory.names(), vec!["noop"]);
    }
}
