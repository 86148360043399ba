//! shellish-engine - command execution engine for a line shell
//!
//! Takes an already-parsed [`shell::Pipeline`] and realizes it as one or
//! more OS processes with correctly wired standard streams:
//!
//! - `shell::path` - search-path resolution for bare executable names
//! - `shell::streams` - per-stage stdin/stdout planning and redirection
//! - `shell::execute` - process orchestration (spawn, connect, wait/detach)
//! - `shell::commands` - built-in commands (`cd`, `exit`) and the
//!   [`shell::ShellCommand`] seam for host-registered commands
//! - `shell::background` - registry and opportunistic reaper for detached
//!   pipelines
//!
//! Tokenizing a command line into a pipeline and reading terminal input are
//! the caller's concern; the engine consumes the finished pipeline and hands
//! back an [`shell::ExecuteResult`] telling the interactive loop whether to
//! continue and with what status.

pub mod config;
pub mod error;
pub mod shell;

pub use config::EngineConfig;
pub use error::EngineError;
