use anyhow::{Context, Result};
use std::path::Path;

use super::types::RunReport;

/// Write the run report as pretty JSON
pub async fn generate(report: &RunReport, output: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }
    tokio::fs::write(output, json)
        .await
        .with_context(|| format!("Failed to write report: {}", output.display()))?;
    log::info!("JSON report saved to: {}", output.display());
    Ok(())
}

/// Read a report written by [`generate`]
pub fn load(path: &Path) -> Result<RunReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid report: {}", path.display()))
}
