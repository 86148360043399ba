//! Shell execution engine
//!
//! This module provides the core execution functionality:
//! - `types` - Core data structures (ShellState, pipes, results)
//! - `pipeline` - Parsed command/pipeline model handed in by the caller
//! - `path` - Search-path resolution for executable names
//! - `streams` - Per-stage stream planning and redirection
//! - `execute` - Process orchestration
//! - `commands` - Built-in shell commands
//! - `background` - Detached-pipeline registry and reaper

pub mod background;
pub mod commands;
pub mod execute;
pub mod path;
pub mod pipeline;
pub mod streams;
pub mod types;

// Re-export main execution functions
pub use execute::{execute, execute_with_stdio};

// Re-export types
pub use pipeline::{Command, Pipeline, Redirects};
pub use types::{
    pipe, EnvChange, ExecuteResult, FutureExecuteResult, ShellPipeReader, ShellPipeWriter,
    ShellState,
};

// Re-export command types
pub use commands::{builtin_commands, ShellCommand, ShellCommandContext};

pub use background::BackgroundJobs;
pub use path::SearchPath;
pub use streams::{InputPlan, OutputPlan, StreamPlan};
