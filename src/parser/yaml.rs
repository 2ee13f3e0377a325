use anyhow::{Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::path::Path;

use super::types::{CommandSpec, ScriptHeader, TestScript};

/// Parse a YAML script file
pub fn parse_script_file(path: &Path) -> Result<TestScript> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    parse_script_content(&content)
        .with_context(|| format!("Failed to parse script: {}", path.display()))
}

/// Parse YAML script content.
///
/// Accepted layouts:
/// - a header document, `---`, then a document holding the command list
/// - a single document holding only the command list
/// - a single mapping with the header keys plus a `commands` list
pub fn parse_script_content(content: &str) -> Result<TestScript> {
    let mut documents = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = Value::deserialize(document).context("Invalid YAML")?;
        if !value.is_null() {
            documents.push(value);
        }
    }

    match documents.as_slice() {
        [] => Ok(TestScript::default()),
        [Value::Sequence(commands)] => Ok(TestScript {
            header: ScriptHeader::default(),
            commands: parse_commands(commands)?,
        }),
        [Value::Mapping(map)] => {
            let mut header = map.clone();
            let commands = match header.remove("commands") {
                Some(Value::Sequence(commands)) => parse_commands(&commands)?,
                Some(_) => anyhow::bail!("'commands' must be a list"),
                None => Vec::new(),
            };
            Ok(TestScript {
                header: parse_header(Value::Mapping(header))?,
                commands,
            })
        }
        [header, Value::Sequence(commands)] => Ok(TestScript {
            header: parse_header(header.clone())?,
            commands: parse_commands(commands)?,
        }),
        [_, _] => anyhow::bail!("The document after '---' must be a list of commands"),
        _ => anyhow::bail!(
            "Expected at most two YAML documents, found {}",
            documents.len()
        ),
    }
}

fn parse_header(value: Value) -> Result<ScriptHeader> {
    let Value::Mapping(mut map) = value else {
        anyhow::bail!("Script header must be a mapping");
    };
    // Scalar variable values are kept as text whatever their YAML type.
    for key in ["vars", "var", "env"] {
        if let Some(Value::Mapping(vars)) = map.get_mut(key) {
            for (_, v) in vars.iter_mut() {
                *v = Value::String(scalar_to_string(v)?);
            }
        }
    }
    serde_yaml::from_value(Value::Mapping(map)).context("Invalid script header")
}

fn parse_commands(values: &[Value]) -> Result<Vec<CommandSpec>> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            parse_command_value(value).with_context(|| format!("Invalid command at position {}", i + 1))
        })
        .collect()
}

/// Parse one command entry.
///
/// Either the full form `{command: name, args: [..], body: [..]}` or the
/// shorthand `{name: args}` where `args` is empty, a scalar or a list of
/// scalars (a `body` key may sit beside the name). A bare string is a command
/// without arguments.
pub fn parse_command_value(value: &Value) -> Result<CommandSpec> {
    match value {
        Value::String(name) => Ok(CommandSpec::new(name.clone(), Vec::new())),
        Value::Mapping(map) => {
            let body = match map.get("body") {
                Some(Value::Sequence(body)) => Some(parse_commands(body)?),
                Some(Value::Null) | None => None,
                Some(_) => anyhow::bail!("'body' must be a list of commands"),
            };

            if let Some(name) = map.get("command") {
                let name = name
                    .as_str()
                    .context("'command' must be a string")?
                    .to_string();
                let args = match map.get("args") {
                    Some(args) => parse_args(args)?,
                    None => Vec::new(),
                };
                return Ok(CommandSpec { command: name, args, body });
            }

            let mut entries = map.iter().filter(|(k, _)| k.as_str() != Some("body"));
            match (entries.next(), entries.next()) {
                (Some((name, args)), None) => {
                    let name = name.as_str().context("Command name must be a string")?;
                    Ok(CommandSpec {
                        command: name.to_string(),
                        args: parse_args(args)?,
                        body,
                    })
                }
                _ => anyhow::bail!("Expected exactly one command name in {:?}", map),
            }
        }
        _ => anyhow::bail!("Unsupported command entry: {:?}", value),
    }
}

fn parse_args(value: &Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => items.iter().map(scalar_to_string).collect(),
        scalar => Ok(vec![scalar_to_string(scalar)?]),
    }
}

fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) => Ok(s.clone()),
        _ => anyhow::bail!("Expected a scalar value, found {:?}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::vars::SourceType;

    #[test]
    fn test_header_and_commands() {
        let yaml = r#"
name: Login
sourceType: side
config:
  maxRetries: 2
  speed: 100
vars:
  user: alice
  attempts: 3
---
- command: store
  args: ["${user}", who]
- echo: "hello ${who}"
- pause: 500
- comment
"#;
        let script = parse_script_content(yaml).unwrap();
        assert_eq!(script.header.name.as_deref(), Some("Login"));
        assert_eq!(script.header.source_type, SourceType::Side);
        assert_eq!(script.header.config.max_retries, Some(2));
        assert_eq!(script.header.config.speed_ms, Some(100));
        assert_eq!(script.header.vars.get("attempts").map(String::as_str), Some("3"));
        assert_eq!(
            script.commands,
            vec![
                CommandSpec::new("store", vec!["${user}".into(), "who".into()]),
                CommandSpec::new("echo", vec!["hello ${who}".into()]),
                CommandSpec::new("pause", vec!["500".into()]),
                CommandSpec::new("comment", vec![]),
            ]
        );
    }

    #[test]
    fn test_list_only() {
        let script = parse_script_content("- echo: hi\n").unwrap();
        assert_eq!(script.header, ScriptHeader::default());
        assert_eq!(script.commands.len(), 1);
    }

    #[test]
    fn test_single_mapping_with_commands() {
        let yaml = "name: Inline\ncommands:\n  - echo: hi\n  - echo: there\n";
        let script = parse_script_content(yaml).unwrap();
        assert_eq!(script.name_or("x"), "Inline");
        assert_eq!(script.commands.len(), 2);
    }

    #[test]
    fn test_nested_bodies() {
        let yaml = r#"
- command: while
  args: ["${n} < 3"]
  body:
    - store: ["javascript{${n} + 1}", n]
    - if: "${n} == 2"
      body:
        - echo: two
- echo: done
"#;
        let script = parse_script_content(yaml).unwrap();
        assert_eq!(script.command_count(), 5);
        let body = script.commands[0].body.as_ref().unwrap();
        assert_eq!(body[1].command, "if");
        assert_eq!(body[1].args, vec!["${n} == 2"]);
        assert_eq!(body[1].body.as_ref().unwrap()[0].args, vec!["two"]);
    }

    #[test]
    fn test_rejects_ambiguous_entries() {
        let err = parse_script_content("- echo: hi\n  store: [a, b]\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid command at position 1"));
        assert!(parse_script_content("- echo: {nested: map}\n").is_err());
    }

    #[test]
    fn test_empty_content() {
        assert_eq!(parse_script_content("").unwrap(), TestScript::default());
    }
}
