//! Labels, jumps and block commands.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::CommandFactory;
use crate::command::{ArgumentType, Command, CommandHandler, CommandList};
use crate::runner::context::ExecutionContext;
use crate::runner::state::{CommandResultList, Outcome};

pub(super) fn register(factory: &mut CommandFactory) {
    factory.register("label", || Box::new(Label));
    factory.register("gotoLabel", || Box::new(GotoLabel));
    factory.register("gotoIf", || Box::new(GotoIf));
    factory.register_block("if", |body| Box::new(Block::new(BlockKind::If, body)));
    factory.register_block("while", |body| Box::new(Block::new(BlockKind::While, body)));
}

/// Jump target; does nothing when executed.
pub struct Label;

#[async_trait]
impl CommandHandler for Label {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Variable]
    }

    fn label(&self, args: &[String]) -> Option<String> {
        args.first().filter(|l| !l.is_empty()).cloned()
    }

    fn is_retryable(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _command: &Command,
        _context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        _args: &[String],
    ) -> Result<Outcome> {
        Ok(Outcome::Success)
    }
}

/// `gotoLabel(label)`: continue at the label's command.
pub struct GotoLabel;

#[async_trait]
impl CommandHandler for GotoLabel {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Variable]
    }

    fn is_retryable(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        context.current_iterator_mut()?.jump_to(args[0].as_str())?;
        Ok(Outcome::Success)
    }
}

/// `gotoIf(expression, label)`: jump when the expression is truthy.
pub struct GotoIf;

#[async_trait]
impl CommandHandler for GotoIf {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Script, ArgumentType::Variable]
    }

    fn is_retryable(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        if context.evaluate_condition(&args[0])? {
            context.current_iterator_mut()?.jump_to(args[1].as_str())?;
        }
        Ok(Outcome::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    If,
    While,
}

/// `if(expression)` / `while(expression)` owning a nested body.
///
/// The body's results are appended to the same result list; the block's own
/// outcome is the aggregate of those results, so an Aborted body aborts the
/// enclosing list too.
pub struct Block {
    kind: BlockKind,
    body: Arc<CommandList>,
}

impl Block {
    pub fn new(kind: BlockKind, body: Arc<CommandList>) -> Self {
        Self { kind, body }
    }
}

#[async_trait]
impl CommandHandler for Block {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Script]
    }

    fn is_retryable(&self) -> bool {
        false
    }

    async fn execute(
        &self,
        command: &Command,
        context: &mut ExecutionContext,
        results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        match self.kind {
            BlockKind::If => {
                if !context.evaluate_condition(&args[0])? {
                    return Ok(Outcome::Success);
                }
                let start = results.len();
                self.body.execute(context, results).await;
                Ok(results.aggregate_since(start))
            }
            BlockKind::While => {
                // Variables change between passes, so the raw condition is
                // resolved again before every evaluation.
                let raw = &command.arguments()[0];
                let condition = |context: &ExecutionContext| {
                    let expression =
                        context
                            .vars()
                            .resolve(raw, ArgumentType::Script, context.source_type());
                    context.evaluate_condition(&expression)
                };
                self.body.execute_loop(context, results, &condition).await
            }
        }
    }
}
