//! Built-in shell commands
//!
//! Built-ins run in the parent because they must mutate the parent's own
//! state (`cd`) or decide the interactive loop's fate (`exit`). The same
//! `ShellCommand` seam lets hosts register their own commands (the chat
//! subsystem registers itself this way).

mod cd;
mod exit;

use std::collections::HashMap;
use std::rc::Rc;

use super::types::{FutureExecuteResult, ShellPipeReader, ShellPipeWriter, ShellState};

pub use cd::CdCommand;
pub use exit::ExitCommand;

/// Trait for implementing shell commands.
///
/// Commands receive a context with arguments, a state snapshot, and I/O
/// pipes, and return a future that resolves to an execution result.
pub trait ShellCommand: Send {
    /// Execute the command with the given context.
    fn execute(&self, context: ShellCommandContext) -> FutureExecuteResult;
}

/// Context provided to shell commands during execution.
pub struct ShellCommandContext {
    /// Command arguments (including the command name as args[0])
    pub args: Vec<String>,
    /// Snapshot of the shell state; durable changes travel back as
    /// `EnvChange` values in the result
    pub state: ShellState,
    /// Standard input pipe
    pub stdin: ShellPipeReader,
    /// Standard output pipe
    pub stdout: ShellPipeWriter,
    /// Standard error pipe
    pub stderr: ShellPipeWriter,
}

impl ShellCommandContext {
    /// Write a line to stdout.
    pub fn write_line(&mut self, msg: &str) -> anyhow::Result<()> {
        self.stdout.write_line(msg)
    }

    /// Write a diagnostic line to stderr, prefixed with the shell name.
    pub fn write_diagnostic(&mut self, msg: &str) -> anyhow::Result<()> {
        let line = format!("{}: {}", self.state.name(), msg);
        self.stderr.write_line(&line)
    }
}

/// Get all built-in commands as a HashMap.
pub fn builtin_commands() -> HashMap<String, Rc<dyn ShellCommand>> {
    let mut commands: HashMap<String, Rc<dyn ShellCommand>> = HashMap::new();
    commands.insert("cd".to_string(), Rc::new(CdCommand));
    commands.insert("exit".to_string(), Rc::new(ExitCommand));
    commands
}
