use colored::Colorize;
use tokio::sync::broadcast;

use super::state::OutcomeReport;

/// Execution events for real-time updates
#[derive(Debug, Clone, PartialEq)]
pub enum TestEvent {
    // Run events
    RunStarted {
        run_id: String,
        name: String,
        command_count: usize,
    },
    RunFinished {
        run_id: String,
        outcome: OutcomeReport,
        executed: usize,
        duration_ms: u64,
    },

    // Command events
    CommandStarted {
        sequence: String,
        command: String,
        depth: usize,
    },
    CommandRetrying {
        sequence: String,
        attempt: u32,
        max_attempts: u32,
        depth: usize,
    },
    CommandFinished {
        sequence: String,
        command: String,
        outcome: OutcomeReport,
        duration_ms: u64,
        depth: usize,
    },

    // Operator is being prompted
    Interactive {
        command: String,
    },

    // Log event for coordinated output
    Log {
        message: String,
        depth: usize,
    },
}

/// Nesting depth of a dotted step sequence ("3" → 0, "3.1" → 1).
pub fn sequence_depth(sequence: &str) -> usize {
    sequence.matches('.').count()
}

/// Event emitter for broadcasting execution events
#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        // No subscriber is not an error
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TestEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => Self::print(&event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("console listener skipped {} events", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    fn print(event: &TestEvent) {
        match event {
            TestEvent::RunStarted {
                run_id,
                name,
                command_count,
            } => {
                println!(
                    "\n{} Run {} started: {} ({} commands)",
                    "▶".green().bold(),
                    run_id.cyan(),
                    name.white().bold(),
                    command_count
                );
            }

            TestEvent::RunFinished {
                outcome,
                executed,
                duration_ms,
                ..
            } => {
                println!(
                    "\n{} Run finished [{}]",
                    "■".blue().bold(),
                    outcome_label(outcome)
                );
                println!("  Executed commands: {}", executed);
                println!("  Duration: {}ms", duration_ms);
            }

            TestEvent::CommandStarted {
                sequence, command, ..
            } => {
                log::debug!("[{}] {} started", sequence, command);
            }

            TestEvent::CommandRetrying {
                sequence,
                attempt,
                max_attempts,
                depth,
            } => {
                let indent = "    ".repeat(*depth);
                println!(
                    "{}  {} [{}] {}",
                    indent,
                    "↻".yellow(),
                    sequence,
                    format!("retry {}/{}", attempt, max_attempts).yellow()
                );
            }

            TestEvent::CommandFinished {
                sequence,
                command,
                outcome,
                duration_ms,
                depth,
            } => {
                let indent = "    ".repeat(*depth);
                let mark = match outcome {
                    OutcomeReport::Success => "✓".green(),
                    OutcomeReport::Warning { .. } => "⚠".yellow(),
                    OutcomeReport::Error { .. } => "✗".red(),
                    OutcomeReport::Aborted => "■".red().bold(),
                };
                println!(
                    "{}  {} [{}] {} ({}ms)",
                    indent,
                    mark,
                    sequence,
                    command.dimmed(),
                    duration_ms
                );
                match outcome {
                    OutcomeReport::Warning { message } | OutcomeReport::Error { message } => {
                        println!("{}      {}", indent, message);
                    }
                    _ => {}
                }
            }

            TestEvent::Interactive { command } => {
                log::debug!("waiting for operator at {}", command);
            }

            TestEvent::Log { message, depth } => {
                let indent = "    ".repeat(*depth);
                println!("{}      {}", indent, message);
            }
        }
    }
}

fn outcome_label(outcome: &OutcomeReport) -> colored::ColoredString {
    match outcome {
        OutcomeReport::Success => "SUCCESS".green().bold(),
        OutcomeReport::Warning { .. } => "WARNING".yellow().bold(),
        OutcomeReport::Error { .. } => "ERROR".red().bold(),
        OutcomeReport::Aborted => "ABORTED".red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_depth() {
        assert_eq!(sequence_depth("3"), 0);
        assert_eq!(sequence_depth("3.1"), 1);
        assert_eq!(sequence_depth("3.1.4"), 2);
    }

    #[tokio::test]
    async fn test_emit_reaches_subscribers() {
        let (emitter, mut receiver) = EventEmitter::new();
        emitter.emit(TestEvent::Log {
            message: "hello".into(),
            depth: 0,
        });
        assert_eq!(
            receiver.recv().await.unwrap(),
            TestEvent::Log {
                message: "hello".into(),
                depth: 0
            }
        );
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        EventEmitter::default().emit(TestEvent::Interactive {
            command: "echo [x]".into(),
        });
    }
}
