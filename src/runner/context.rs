use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::events::{EventEmitter, TestEvent};
use super::interactive::{Console, StdConsole};
use super::js_engine::{JsEvaluator, ScriptEvaluator};
use super::vars::{SourceType, VarsMap};
use crate::command::{Command, CommandListIterator};
use crate::driver::traits::BrowserDriver;
use crate::error::EngineError;
use crate::utils::config::Config;

/// The test case currently being executed
#[derive(Debug, Clone, Default)]
pub struct TestCase {
    pub name: String,
    pub source_type: SourceType,
}

impl TestCase {
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
        }
    }
}

/// Mutable state of one run.
///
/// Every operation of the engine receives the context explicitly; nothing here
/// is global, so concurrent runs each need their own context.
pub struct ExecutionContext {
    config: Config,
    vars: VarsMap,
    test_case: Option<TestCase>,
    retries: u32,
    interactive: bool,
    /// Cursors of the command lists currently executing, innermost last.
    iterators: Vec<CommandListIterator>,
    driver: Box<dyn BrowserDriver>,
    evaluator: Box<dyn ScriptEvaluator>,
    console: Box<dyn Console>,
    emitter: EventEmitter,
    output_dir: PathBuf,
}

impl ExecutionContext {
    pub fn new(config: Config, driver: Box<dyn BrowserDriver>) -> Self {
        Self {
            interactive: config.interactive,
            config,
            vars: VarsMap::new(),
            test_case: None,
            retries: 0,
            iterators: Vec::new(),
            driver,
            evaluator: Box::new(JsEvaluator),
            console: Box::new(StdConsole::new()),
            emitter: EventEmitter::default(),
            output_dir: PathBuf::from("."),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Box<dyn ScriptEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_console(mut self, console: Box<dyn Console>) -> Self {
        self.console = console;
        self
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn with_output_dir(mut self, output_dir: &Path) -> Self {
        self.output_dir = output_dir.to_path_buf();
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    pub fn vars(&self) -> &VarsMap {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut VarsMap {
        &mut self.vars
    }

    pub fn test_case(&self) -> Option<&TestCase> {
        self.test_case.as_ref()
    }

    pub fn set_test_case(&mut self, test_case: TestCase) {
        self.test_case = Some(test_case);
    }

    pub fn source_type(&self) -> SourceType {
        self.test_case
            .as_ref()
            .map(|t| t.source_type)
            .unwrap_or_default()
    }

    pub fn driver(&self) -> &dyn BrowserDriver {
        self.driver.as_ref()
    }

    /// Get the output path for a file
    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    /// Raw arguments of `command` with variables resolved per argument kind.
    pub fn resolve_arguments(&self, command: &Command) -> Vec<String> {
        let source = self.source_type();
        command
            .arguments()
            .iter()
            .zip(command.argument_types())
            .map(|(raw, kind)| self.vars.resolve(raw, *kind, source))
            .collect()
    }

    /// Evaluate an embedded script expression.
    pub fn evaluate(&self, expression: &str) -> Result<Option<String>> {
        self.evaluator.eval(self, expression)
    }

    /// Evaluate an embedded script expression as a condition.
    pub fn evaluate_condition(&self, expression: &str) -> Result<bool> {
        self.evaluator.eval_bool(self, expression)
    }

    pub fn reset_retries(&mut self) {
        self.retries = 0;
    }

    pub fn increment_retries(&mut self) {
        self.retries += 1;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn has_reached_max_retries(&self) -> bool {
        self.retries >= self.config.max_retries
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn set_interactive(&mut self, interactive: bool) {
        if self.interactive != interactive {
            log::info!(
                "interactive mode {}",
                if interactive { "enabled" } else { "disabled" }
            );
        }
        self.interactive = interactive;
    }

    /// Delay applied after every command that did not abort.
    pub async fn wait_speed(&self) {
        sleep_ms(self.config.speed_ms).await;
    }

    /// Delay applied between two attempts of the same command.
    pub async fn wait_retry(&self) {
        sleep_ms(self.config.retry_interval_ms).await;
    }

    pub fn current_iterator(&self) -> Option<&CommandListIterator> {
        self.iterators.last()
    }

    /// Cursor of the innermost executing list, for commands that jump.
    pub fn current_iterator_mut(&mut self) -> Result<&mut CommandListIterator, EngineError> {
        self.iterators
            .last_mut()
            .ok_or(EngineError::NoActiveIterator)
    }

    /// Push a cursor and return the stack depth to restore on exit.
    pub(crate) fn push_iterator(&mut self, iterator: CommandListIterator) -> usize {
        let depth = self.iterators.len();
        self.iterators.push(iterator);
        depth
    }

    /// Drop every cursor above `depth`.
    pub(crate) fn pop_iterators_to(&mut self, depth: usize) {
        if self.iterators.len() > depth + 1 {
            log::warn!(
                "discarding {} stale command list iterator(s)",
                self.iterators.len() - depth - 1
            );
        }
        self.iterators.truncate(depth);
    }

    pub fn iterator_depth(&self) -> usize {
        self.iterators.len()
    }

    /// Nesting level of the list currently executing, 0 at top level.
    pub fn nesting(&self) -> usize {
        self.iterators.len().saturating_sub(1)
    }

    pub fn console_mut(&mut self) -> &mut dyn Console {
        self.console.as_mut()
    }

    pub fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }

    pub fn emit(&self, event: TestEvent) {
        self.emitter.emit(event);
    }
}

async fn sleep_ms(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{command_with, context};
    use crate::command::ArgumentType;

    #[test]
    fn test_retry_accounting() {
        let mut ctx = context();
        ctx.config.max_retries = 2;
        assert!(!ctx.has_reached_max_retries());
        ctx.increment_retries();
        ctx.increment_retries();
        assert!(ctx.has_reached_max_retries());
        ctx.reset_retries();
        assert_eq!(ctx.retries(), 0);
    }

    #[test]
    fn test_resolve_arguments_by_kind() {
        let mut ctx = context();
        ctx.vars_mut().set("name", "Alice");
        let cmd = command_with(
            "store",
            &["Hi ${name}", "${name}"],
            &[ArgumentType::Value, ArgumentType::Variable],
        );
        assert_eq!(ctx.resolve_arguments(&cmd), vec!["Hi Alice", "${name}"]);
    }

    #[test]
    fn test_source_type_from_test_case() {
        let mut ctx = context();
        assert_eq!(ctx.source_type(), SourceType::Selenese);
        ctx.set_test_case(TestCase::new("login", SourceType::Side));
        assert_eq!(ctx.source_type(), SourceType::Side);
    }

    #[test]
    fn test_no_active_iterator() {
        let mut ctx = context();
        assert_eq!(
            ctx.current_iterator_mut().unwrap_err(),
            EngineError::NoActiveIterator
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_speed_sleeps_configured_delay() {
        let mut ctx = context();
        ctx.config.speed_ms = 250;
        let start = tokio::time::Instant::now();
        ctx.wait_speed().await;
        assert!(start.elapsed() >= Duration::from_millis(250));
    }
}
