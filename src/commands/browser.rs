use anyhow::{Context as _, Result};
use async_trait::async_trait;
use serde_json::Value;

use super::CommandFactory;
use crate::command::{ArgumentType, Command, CommandHandler, Screenshot};
use crate::runner::context::ExecutionContext;
use crate::runner::state::{CommandResultList, Outcome};

pub(super) fn register(factory: &mut CommandFactory) {
    factory.register("allowNativeXpath", || Box::new(AllowNativeXpath));
    factory.register("sendChromiumCommand", || Box::new(SendChromiumCommand));
    factory.register("captureEntirePageScreenshot", || {
        Box::new(CaptureEntirePageScreenshot)
    });
}

/// Only native XPath is available; asking for anything else is a warning.
pub struct AllowNativeXpath;

#[async_trait]
impl CommandHandler for AllowNativeXpath {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value]
    }

    async fn execute(
        &self,
        _command: &Command,
        _context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let flag = &args[0];
        Ok(if flag.is_empty() {
            Outcome::error("You must set this value to 'true' or 'false'")
        } else if !flag.eq_ignore_ascii_case("true") {
            Outcome::warning("Supported XPath is native only")
        } else {
            Outcome::Success
        })
    }
}

/// `sendChromiumCommand(command, params)`: raw DevTools passthrough.
pub struct SendChromiumCommand;

#[async_trait]
impl CommandHandler for SendChromiumCommand {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value, ArgumentType::Value]
    }

    async fn execute(
        &self,
        _command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let params = if args[1].trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&args[1])
                .with_context(|| format!("Invalid JSON parameters: {}", args[1]))?
        };
        let response = context.driver().send_command(&args[0], params).await?;
        log::info!("{} -> {}", args[0], response);
        Ok(Outcome::Success)
    }
}

/// `captureEntirePageScreenshot(filename)`: full-page capture kept on the
/// command.
pub struct CaptureEntirePageScreenshot;

#[async_trait]
impl CommandHandler for CaptureEntirePageScreenshot {
    fn argument_types(&self) -> &'static [ArgumentType] {
        &[ArgumentType::Value]
    }

    async fn execute(
        &self,
        command: &Command,
        context: &mut ExecutionContext,
        _results: &mut CommandResultList,
        args: &[String],
    ) -> Result<Outcome> {
        let filename = if args[0].trim().is_empty() {
            format!(
                "screenshot_{}_{}.png",
                command.index(),
                chrono::Utc::now().format("%Y%m%d_%H%M%S%3f")
            )
        } else {
            args[0].clone()
        };
        let path = context.output_path(&filename);
        context
            .driver()
            .take_full_page_screenshot(&path)
            .await
            .with_context(|| format!("Failed to capture {}", path.display()))?;
        command.add_screenshot(Screenshot::new(path));
        Ok(Outcome::Success)
    }
}
