pub mod context;
pub mod events;
pub mod executor;
pub mod interactive;
pub mod js_engine;
pub mod state;
pub mod vars;

use anyhow::{Context as _, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::commands::CommandFactory;
use crate::driver::create_driver;
use crate::parser::{parse_script_file, TestScript};
use crate::report::{json, RunReport};
use crate::utils::config::{Config, ConfigOverrides};
use context::{ExecutionContext, TestCase};

pub use events::*;
pub use state::*;

/// Settings of one `run` invocation
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Base configuration file; defaults apply when absent.
    pub config_path: Option<PathBuf>,
    /// Command-line overrides, applied after the script header.
    pub overrides: ConfigOverrides,
    /// Variables bound after the script header's.
    pub vars: Vec<(String, String)>,
    pub output: PathBuf,
    pub driver: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            overrides: ConfigOverrides::default(),
            vars: Vec::new(),
            output: PathBuf::from("./output"),
            driver: "dry-run".to_string(),
        }
    }
}

/// Load, execute and record the script at `path`.
///
/// The JSON report is written to `results.json` in the output directory.
pub async fn run_script(
    path: &Path,
    options: &RunOptions,
    emitter: EventEmitter,
) -> Result<RunReport> {
    let script = parse_script_file(path)?;

    let mut config = match &options.config_path {
        Some(config_path) => Config::from_file(config_path)?,
        None => Config::default(),
    };
    config.apply(&script.header.config);
    config.apply(&options.overrides);
    log::debug!("effective config: {:?}", config);

    std::fs::create_dir_all(&options.output)
        .with_context(|| format!("Failed to create {}", options.output.display()))?;

    let driver = create_driver(&options.driver)?;
    let mut context = ExecutionContext::new(config, driver)
        .with_emitter(emitter)
        .with_output_dir(&options.output);

    let default_name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    for (name, value) in &options.vars {
        context.vars_mut().set(name.as_str(), value.as_str());
    }

    let report = run(
        &script,
        &default_name,
        &CommandFactory::with_builtins(),
        &mut context,
    )
    .await?;
    json::generate(&report, &options.output.join("results.json")).await?;
    Ok(report)
}

/// Execute an already parsed script in `context`.
///
/// Header variables are bound only where the context has no value yet, so
/// bindings made by the caller win.
pub async fn run(
    script: &TestScript,
    default_name: &str,
    factory: &CommandFactory,
    context: &mut ExecutionContext,
) -> Result<RunReport> {
    let commands = Arc::new(script.to_command_list(factory)?);
    let name = script.name_or(default_name).to_string();

    for (key, value) in &script.header.vars {
        if !context.vars().contains(key) {
            context.vars_mut().set(key.as_str(), value.as_str());
        }
    }
    context.set_test_case(TestCase::new(name.clone(), script.header.source_type));

    let run_id = uuid::Uuid::new_v4().to_string();
    log::info!("Run {} started: {}", run_id, name);
    context.emit(TestEvent::RunStarted {
        run_id: run_id.clone(),
        name: name.clone(),
        command_count: script.command_count(),
    });

    let started_at = Utc::now();
    let mut results = CommandResultList::new();
    let outcome = commands.execute(context, &mut results).await;
    let report = RunReport::new(run_id.clone(), name, &results, started_at, Utc::now());

    log::info!("Run {} finished: {}", run_id, outcome);
    context.emit(TestEvent::RunFinished {
        run_id,
        outcome: report.outcome.clone(),
        executed: report.summary.executed,
        duration_ms: report.duration_ms,
    });
    Ok(report)
}
