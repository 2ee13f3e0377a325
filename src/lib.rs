pub mod command;
pub mod commands;
pub mod driver;
pub mod error;
pub mod parser;
pub mod report;
pub mod runner;
pub mod utils;

#[cfg(test)]
mod test_support;

// Re-export common items
pub use command::{Command, CommandHandler, CommandList};
pub use commands::CommandFactory;
pub use error::EngineError;
pub use runner::context::ExecutionContext;
pub use runner::state::{CommandResultList, Outcome};
pub use runner::{run, run_script, RunOptions};
