use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::runner::vars::SourceType;
use crate::utils::config::ConfigOverrides;

/// Script header: everything before the command list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default)]
    pub config: ConfigOverrides,
    /// Initial variable bindings
    #[serde(default, alias = "var", alias = "env")]
    pub vars: BTreeMap<String, String>,
}

/// One command of a script, possibly owning a nested body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Vec<CommandSpec>>,
}

impl CommandSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            body: None,
        }
    }

    /// Number of commands in this entry, nested bodies included.
    pub fn count(&self) -> usize {
        1 + self
            .body
            .iter()
            .flatten()
            .map(CommandSpec::count)
            .sum::<usize>()
    }
}

/// A parsed test script
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestScript {
    pub header: ScriptHeader,
    pub commands: Vec<CommandSpec>,
}

impl TestScript {
    /// Display name, falling back to the given default.
    pub fn name_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.header.name.as_deref().unwrap_or(default)
    }

    /// Total number of commands, nested bodies included.
    pub fn command_count(&self) -> usize {
        self.commands.iter().map(CommandSpec::count).sum()
    }
}
