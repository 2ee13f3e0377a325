use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Browser session the commands act upon
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Capture the visible viewport to `path`.
    async fn take_screenshot(&self, path: &Path) -> Result<()>;

    /// Capture the whole page, beyond the viewport, to `path`.
    async fn take_full_page_screenshot(&self, path: &Path) -> Result<()> {
        self.take_screenshot(path).await
    }

    /// Send a raw DevTools protocol command and return its result.
    async fn send_command(&self, command: &str, params: Value) -> Result<Value> {
        let _ = params;
        anyhow::bail!("{} does not support DevTools command '{}'", self.name(), command)
    }
}
