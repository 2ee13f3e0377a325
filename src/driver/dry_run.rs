//! Driver that performs no browser work.
//!
//! Screenshots are written as empty files so artifact paths stay real, and
//! every call is recorded for inspection.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Mutex;

use super::traits::BrowserDriver;

/// One call received by [`DryRunDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Screenshot { path: String, full_page: bool },
    Command { command: String, params: Value },
}

#[derive(Debug, Default)]
pub struct DryRunDriver {
    calls: Mutex<Vec<DriverCall>>,
}

impl DryRunDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    fn record(&self, call: DriverCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    async fn write_placeholder(&self, path: &Path, full_page: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        tokio::fs::write(path, b"")
            .await
            .with_context(|| format!("Failed to write screenshot {}", path.display()))?;
        log::debug!("dry-run screenshot: {}", path.display());
        self.record(DriverCall::Screenshot {
            path: path.display().to_string(),
            full_page,
        });
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for DryRunDriver {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn take_screenshot(&self, path: &Path) -> Result<()> {
        self.write_placeholder(path, false).await
    }

    async fn take_full_page_screenshot(&self, path: &Path) -> Result<()> {
        self.write_placeholder(path, true).await
    }

    async fn send_command(&self, command: &str, params: Value) -> Result<Value> {
        log::debug!("dry-run DevTools command: {} {}", command, params);
        self.record(DriverCall::Command {
            command: command.to_string(),
            params,
        });
        Ok(json!({}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls() {
        let driver = DryRunDriver::new();
        let result = driver
            .send_command("Page.reload", json!({"ignoreCache": true}))
            .await
            .unwrap();
        assert_eq!(result, json!({}));

        let dir = std::env::temp_dir().join(format!("dry-run-{}", uuid::Uuid::new_v4()));
        let shot = dir.join("shot.png");
        driver.take_full_page_screenshot(&shot).await.unwrap();
        assert!(shot.exists());

        assert_eq!(
            driver.calls(),
            vec![
                DriverCall::Command {
                    command: "Page.reload".into(),
                    params: json!({"ignoreCache": true}),
                },
                DriverCall::Screenshot {
                    path: shot.display().to_string(),
                    full_page: true,
                },
            ]
        );
        let _ = std::fs::remove_dir_all(dir);
    }
}
