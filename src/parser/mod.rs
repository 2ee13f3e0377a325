pub mod types;
pub mod yaml;

use anyhow::{Context, Result};

use crate::command::CommandList;
use crate::commands::CommandFactory;
use types::CommandSpec;

pub use types::{ScriptHeader, TestScript};
pub use yaml::{parse_script_content, parse_script_file};

impl TestScript {
    /// Build the executable command list, numbering commands depth first in
    /// source order.
    pub fn to_command_list(&self, factory: &CommandFactory) -> Result<CommandList> {
        let mut next_index = 0;
        build_list(&self.commands, factory, &mut next_index)
    }
}

fn build_list(
    specs: &[CommandSpec],
    factory: &CommandFactory,
    next_index: &mut usize,
) -> Result<CommandList> {
    let mut list = CommandList::new();
    for spec in specs {
        let index = *next_index;
        *next_index += 1;
        let command = match &spec.body {
            Some(body) => {
                let body = build_list(body, factory, next_index)?;
                factory.create_block(index, &spec.command, spec.args.clone(), body)
            }
            None => factory.create(index, &spec.command, spec.args.clone()),
        }
        .with_context(|| format!("Invalid command #{} '{}'", index, spec.command))?;
        list.add(command);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_first_indices() {
        let script = parse_script_content(
            "- echo: a\n- if: 'true'\n  body:\n    - echo: b\n    - echo: c\n- echo: d\n",
        )
        .unwrap();
        let list = script.to_command_list(&CommandFactory::with_builtins()).unwrap();
        let indices: Vec<_> = list.iter().map(|c| c.index()).collect();
        assert_eq!(indices, vec![0, 1, 4]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_bare_comment_and_pause_build() {
        let script = parse_script_content("- comment\n- pause\n- echo: done\n").unwrap();
        let list = script.to_command_list(&CommandFactory::with_builtins()).unwrap();
        let args: Vec<_> = list.iter().map(|c| c.arguments().to_vec()).collect();
        assert_eq!(args, vec![vec![String::new()], vec![String::new()], vec!["done".to_string()]]);
    }

    #[test]
    fn test_build_errors_name_the_command() {
        let factory = CommandFactory::with_builtins();
        let script = parse_script_content("- echo: a\n- click: '#go'\n").unwrap();
        let err = script.to_command_list(&factory).unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "Invalid command #1 'click': unknown command: click"
        );

        let script = parse_script_content("- store: only-one\n").unwrap();
        let err = script.to_command_list(&factory).unwrap_err();
        assert!(format!("{:#}", err).contains("expects 2 argument(s), got 1"));
    }
}
