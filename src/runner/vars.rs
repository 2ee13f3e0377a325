//! Variable bindings shared by every command of a run

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::command::ArgumentType;

static VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").expect("variable pattern"));

/// Format the test case was recorded in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Legacy Selenese table format.
    #[default]
    Selenese,
    /// Selenium IDE `.side` project.
    Side,
}

/// Name → plain-text value bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarsMap {
    vars: HashMap<String, String>,
}

impl VarsMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.vars.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.vars
    }

    /// Resolve one raw argument for dispatch. Never mutates the bindings.
    pub fn resolve(&self, template: &str, kind: ArgumentType, source: SourceType) -> String {
        match kind {
            ArgumentType::Variable => template.to_string(),
            ArgumentType::Script if source == SourceType::Side => {
                self.replace_with(template, |value| {
                    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
                })
            }
            _ => self.substitute(template),
        }
    }

    /// Substitute `${name}` and `${name.json.path}` references.
    ///
    /// Replacement happens in a single pass: a substituted value containing
    /// `${...}` is not expanded again. Unknown names are kept verbatim.
    pub fn substitute(&self, text: &str) -> String {
        self.replace_with(text, str::to_string)
    }

    fn replace_with(&self, text: &str, render: impl Fn(&str) -> String) -> String {
        VAR_RE
            .replace_all(text, |caps: &Captures| {
                let key = &caps[1];
                match self.lookup(key) {
                    Some(value) => render(&value),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        if let Some(value) = self.get(key) {
            return Some(value.to_string());
        }

        // `user.address.city` reads a path inside a JSON-valued `user`.
        let (name, path) = key.split_once('.')?;
        let value: serde_json::Value = serde_json::from_str(self.get(name)?).ok()?;
        let target = value.pointer(&format!("/{}", path.replace('.', "/")))?;
        Some(match target.as_str() {
            Some(s) => s.to_string(),
            None => target.to_string(),
        })
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VarsMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> VarsMap {
        [
            ("name", "Alice"),
            ("tricky", "${name}"),
            ("user", r#"{"address":{"city":"Hanoi"},"age":30}"#),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_substitutes_once() {
        let vars = vars();
        assert_eq!(vars.substitute("Hello ${name}"), "Hello Alice");
        assert_eq!(vars.substitute("${tricky}"), "${name}");
    }

    #[test]
    fn test_unknown_kept_verbatim() {
        assert_eq!(vars().substitute("${missing} ok"), "${missing} ok");
    }

    #[test]
    fn test_json_path() {
        let vars = vars();
        assert_eq!(vars.substitute("${user.address.city}"), "Hanoi");
        assert_eq!(vars.substitute("${user.age}"), "30");
        assert_eq!(vars.substitute("${user.zip}"), "${user.zip}");
    }

    #[test]
    fn test_resolve_by_kind() {
        let vars = vars();
        assert_eq!(
            vars.resolve("${name}", ArgumentType::Variable, SourceType::Selenese),
            "${name}"
        );
        assert_eq!(
            vars.resolve("id=${name}", ArgumentType::Locator, SourceType::Side),
            "id=Alice"
        );
        assert_eq!(
            vars.resolve("${name}.length", ArgumentType::Script, SourceType::Side),
            "\"Alice\".length"
        );
        assert_eq!(
            vars.resolve("${name}.length", ArgumentType::Script, SourceType::Selenese),
            "Alice.length"
        );
    }

    #[test]
    fn test_resolve_does_not_mutate() {
        let vars = vars();
        let before = vars.clone();
        vars.resolve("${name}", ArgumentType::Value, SourceType::Side);
        assert_eq!(vars, before);
    }
}
