use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use selenese_runner::commands::CommandFactory;
use selenese_runner::driver::DRIVER_NAMES;
use selenese_runner::report::json;
use selenese_runner::runner::{self, ConsoleEventListener, EventEmitter, RunOptions};
use selenese_runner::utils::config::ConfigOverrides;

#[derive(Parser)]
#[command(name = "selenese-runner")]
#[command(version = "0.1.0")]
#[command(about = "Run recorded browser test scripts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a test script
    Run {
        /// Path to the YAML script
        script: PathBuf,

        /// Base configuration file (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum retries of a failing command
        #[arg(long)]
        max_retries: Option<u32>,

        /// Delay after every command, in milliseconds
        #[arg(long)]
        speed: Option<u64>,

        /// Delay between retries, in milliseconds
        #[arg(long)]
        retry_interval: Option<u64>,

        /// Start in interactive (single step) mode
        #[arg(short, long, default_value = "false")]
        interactive: bool,

        /// Set a variable, e.g. --var user=alice. Can be specified multiple times.
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Output directory for the report and screenshots
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Browser driver
        #[arg(long, default_value = "dry-run")]
        driver: String,
    },

    /// List available commands
    Commands,

    /// Print the summary of a previous run
    Report {
        /// Path to results.json
        results: PathBuf,
    },
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", raw)),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            script,
            config,
            max_retries,
            speed,
            retry_interval,
            interactive,
            vars,
            output,
            driver,
        } => {
            println!(
                "{} Running script: {}",
                "▶".green().bold(),
                script.display()
            );
            println!("  Driver: {}", driver.cyan());
            println!("  Output: {}", output.display().to_string().cyan());
            if interactive {
                println!("  Interactive: {}", "Enabled".yellow());
            }

            let options = RunOptions {
                config_path: config,
                overrides: ConfigOverrides {
                    max_retries,
                    retry_interval_ms: retry_interval,
                    speed_ms: speed,
                    interactive: interactive.then_some(true),
                    ..Default::default()
                },
                vars,
                output,
                driver,
            };

            let (emitter, receiver) = EventEmitter::new();
            let listener = tokio::spawn(ConsoleEventListener::listen(receiver));
            let result = runner::run_script(&script, &options, emitter).await;
            // All senders are gone once the run returns, so the listener drains and exits.
            let _ = listener.await;

            let report = result?;
            println!(
                "\n  Report: {}",
                options.output.join("results.json").display()
            );
            if !report.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Commands => {
            println!("{}", "Commands:".bold());
            for name in CommandFactory::with_builtins().names() {
                println!("  {}", name);
            }
            println!("\n{} {}", "Drivers:".bold(), DRIVER_NAMES.join(", "));
        }

        Commands::Report { results } => {
            let report = json::load(&results)
                .with_context(|| format!("Cannot load {}", results.display()))?;
            println!(
                "{} {} ({})",
                "■".blue().bold(),
                report.name.white().bold(),
                report.run_id
            );
            println!("  Outcome: {:?}", report.outcome);
            println!(
                "  Executed: {}  Success: {}  Warning: {}  Error: {}  Aborted: {}",
                report.summary.executed,
                report.summary.success.to_string().green(),
                report.summary.warning.to_string().yellow(),
                report.summary.error.to_string().red(),
                report.summary.aborted.to_string().red()
            );
            println!("  Duration: {}ms", report.duration_ms);
            for result in report.results.iter().filter(|r| {
                !matches!(r.outcome, runner::OutcomeReport::Success)
            }) {
                println!("  [{}] {} -> {:?}", result.sequence, result.command, result.outcome);
            }
        }
    }

    Ok(())
}
