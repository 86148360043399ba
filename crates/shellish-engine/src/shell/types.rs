//! Core types for shell execution
//!
//! This module provides the fundamental data structures for the engine:
//! - `ShellState` - Holds environment, cwd, and the command registry
//! - `ExecuteResult` - Result of pipeline execution
//! - `EnvChange` - Parent-state modifications produced by built-ins
//! - `ShellPipeReader`/`ShellPipeWriter` - Pipe abstractions

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::Result;
use futures::future::LocalBoxFuture;
use tokio::task::JoinHandle;

use super::background::BackgroundJobs;
use super::commands::ShellCommand;
use super::path::SearchPath;
use crate::config::EngineConfig;

// ============================================================================
// Shell State
// ============================================================================

/// Central state container for the engine.
///
/// Holds environment variables, the current working directory, registered
/// commands, and the background-job registry. Uses `RefCell` for interior
/// mutability to support mutation through `Rc<ShellState>`.
#[derive(Clone)]
pub struct ShellState {
    /// Shell name used in diagnostic lines
    name: String,
    /// Search-path override from config; falls back to $PATH when unset
    path_override: Option<String>,
    /// Environment variables passed to child processes
    env_vars: RefCell<HashMap<OsString, OsString>>,
    /// Current working directory
    cwd: RefCell<PathBuf>,
    /// Registered commands (built-in + host-registered)
    commands: Rc<HashMap<String, Rc<dyn ShellCommand>>>,
    /// Detached pipelines awaiting opportunistic reaping
    background: BackgroundJobs,
}

impl ShellState {
    /// Create a new shell state.
    ///
    /// # Arguments
    /// * `config` - Engine options (diagnostic name, search-path override)
    /// * `env_vars` - Initial environment variables
    /// * `cwd` - Current working directory (must be absolute)
    /// * `custom_commands` - Commands to register beside the built-ins
    pub fn new(
        config: EngineConfig,
        env_vars: HashMap<OsString, OsString>,
        cwd: PathBuf,
        custom_commands: HashMap<String, Rc<dyn ShellCommand>>,
    ) -> Self {
        assert!(cwd.is_absolute(), "cwd must be absolute path");

        let mut commands = super::commands::builtin_commands();
        commands.extend(custom_commands);

        Self {
            name: config.name,
            path_override: config.path,
            env_vars: RefCell::new(env_vars),
            cwd: RefCell::new(cwd),
            commands: Rc::new(commands),
            background: BackgroundJobs::new(),
        }
    }

    /// Create a default shell state from the process environment.
    pub fn new_default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
        let env_vars: HashMap<OsString, OsString> = std::env::vars_os().collect();
        Self::new(EngineConfig::default(), env_vars, cwd, HashMap::new())
    }

    /// Shell name used as the prefix of diagnostic lines.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> PathBuf {
        self.cwd.borrow().clone()
    }

    /// Set the current working directory, keeping `$PWD` in sync.
    pub fn set_cwd(&self, cwd: PathBuf) {
        *self.cwd.borrow_mut() = cwd.clone();
        self.env_vars
            .borrow_mut()
            .insert("PWD".into(), cwd.into_os_string());
    }

    /// Get all environment variables (cloned).
    pub fn env_vars(&self) -> HashMap<OsString, OsString> {
        self.env_vars.borrow().clone()
    }

    /// Get an environment variable by name.
    pub fn get_env_var(&self, name: &str) -> Option<String> {
        self.env_vars
            .borrow()
            .get(OsStr::new(name))
            .map(|v| v.to_string_lossy().to_string())
    }

    /// Set an environment variable.
    pub fn set_env_var(&self, name: impl Into<OsString>, value: impl Into<OsString>) {
        self.env_vars.borrow_mut().insert(name.into(), value.into());
    }

    /// Apply multiple environment changes.
    pub fn apply_changes(&self, changes: &[EnvChange]) {
        for change in changes {
            self.apply_change(change);
        }
    }

    /// Apply a single environment change.
    pub fn apply_change(&self, change: &EnvChange) {
        match change {
            EnvChange::SetEnvVar(name, value) => {
                self.env_vars
                    .borrow_mut()
                    .insert(name.clone(), value.clone());
            }
            EnvChange::Cd(new_dir) => self.set_cwd(new_dir.clone()),
        }
    }

    /// Snapshot the search path for one resolution attempt.
    ///
    /// The config override wins; otherwise the state's `PATH` variable is
    /// read once and split.
    pub fn search_path(&self) -> SearchPath {
        match &self.path_override {
            Some(value) => SearchPath::from_value(value),
            None => SearchPath::from_value(&self.get_env_var("PATH").unwrap_or_default()),
        }
    }

    /// Resolve a registered (built-in or host) command by name.
    pub fn resolve_custom_command(&self, name: &str) -> Option<Rc<dyn ShellCommand>> {
        self.commands.get(name).cloned()
    }

    /// The detached-pipeline registry.
    pub fn background(&self) -> &BackgroundJobs {
        &self.background
    }

    /// Get the home directory.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_env_var("HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
    }
}

// ============================================================================
// Environment Changes
// ============================================================================

/// A parent-state modification produced by a built-in command.
///
/// Built-ins receive a snapshot of the state; changes that must outlive the
/// command (the whole point of `cd`) travel back as values and are applied
/// by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvChange {
    /// Set an environment variable. None of the bundled built-ins emit
    /// this; it is the seam for host-registered commands (an `export`
    /// equivalent) to mutate the environment children inherit.
    SetEnvVar(OsString, OsString),
    /// Change directory: `cd path`
    Cd(PathBuf),
}

// ============================================================================
// Execution Result
// ============================================================================

/// Future type for async command execution.
pub type FutureExecuteResult = LocalBoxFuture<'static, ExecuteResult>;

/// Result of executing a pipeline or built-in.
#[derive(Debug, PartialEq, Eq)]
pub enum ExecuteResult {
    /// Terminate the interactive loop with a status: `exit <code>`
    Exit(i32),
    /// Continue the loop, with exit code and env changes to apply
    Continue(i32, Vec<EnvChange>),
}

impl ExecuteResult {
    /// Create a plain result from an exit code.
    pub fn from_exit_code(exit_code: i32) -> ExecuteResult {
        ExecuteResult::Continue(exit_code, Vec::new())
    }

    /// Get the exit code without consuming the result.
    pub fn exit_code(&self) -> i32 {
        match self {
            ExecuteResult::Exit(code) => *code,
            ExecuteResult::Continue(code, _) => *code,
        }
    }

    /// Whether the interactive loop should keep running.
    pub fn should_continue(&self) -> bool {
        matches!(self, ExecuteResult::Continue(..))
    }
}

// ============================================================================
// Pipes
// ============================================================================

/// Reader side of a shell pipe.
#[derive(Debug)]
pub enum ShellPipeReader {
    /// OS pipe reader
    OsPipe(std::io::PipeReader),
    /// File reader
    StdFile(std::fs::File),
}

impl Clone for ShellPipeReader {
    fn clone(&self) -> Self {
        match self {
            Self::OsPipe(pipe) => Self::OsPipe(pipe.try_clone().unwrap()),
            Self::StdFile(file) => Self::StdFile(file.try_clone().unwrap()),
        }
    }
}

impl ShellPipeReader {
    /// Duplicate the process's stdin into a reader.
    pub fn stdin() -> ShellPipeReader {
        use std::os::fd::AsFd;
        use std::os::fd::FromRawFd;
        use std::os::fd::IntoRawFd;
        let owned = std::io::stdin().as_fd().try_clone_to_owned().unwrap();
        let raw = owned.into_raw_fd();
        ShellPipeReader::OsPipe(unsafe { std::io::PipeReader::from_raw_fd(raw) })
    }

    /// Create from a file.
    pub fn from_file(std_file: std::fs::File) -> Self {
        Self::StdFile(std_file)
    }

    /// Convert to process stdio.
    pub fn into_stdio(self) -> std::process::Stdio {
        match self {
            Self::OsPipe(pipe) => pipe.into(),
            Self::StdFile(file) => file.into(),
        }
    }

    /// Read bytes into a buffer.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            ShellPipeReader::OsPipe(pipe) => pipe.read(buf).map_err(|e| e.into()),
            ShellPipeReader::StdFile(file) => file.read(buf).map_err(|e| e.into()),
        }
    }

    /// Pipe all data to a writer.
    pub fn pipe_to(mut self, writer: &mut dyn Write) -> Result<()> {
        loop {
            let mut buffer = [0u8; 512];
            let size = match &mut self {
                ShellPipeReader::OsPipe(pipe) => pipe.read(&mut buffer)?,
                ShellPipeReader::StdFile(file) => file.read(&mut buffer)?,
            };
            if size == 0 {
                break;
            }
            writer.write_all(&buffer[0..size])?;
        }
        Ok(())
    }

    /// Drain to a string on a blocking task, returning a handle.
    pub fn pipe_to_string_handle(self) -> JoinHandle<String> {
        tokio::task::spawn_blocking(|| {
            let mut buf = Vec::new();
            self.pipe_to(&mut buf).unwrap();
            String::from_utf8_lossy(&buf).to_string()
        })
    }
}

impl Read for ShellPipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ShellPipeReader::OsPipe(pipe) => pipe.read(buf),
            ShellPipeReader::StdFile(file) => file.read(buf),
        }
    }
}

/// Writer side of a shell pipe.
#[derive(Debug)]
pub enum ShellPipeWriter {
    /// OS pipe writer
    OsPipe(std::io::PipeWriter),
    /// File writer
    StdFile(std::fs::File),
    /// The process's own stdout
    Stdout,
    /// The process's own stderr
    Stderr,
    /// Discard output
    Null,
}

impl Clone for ShellPipeWriter {
    fn clone(&self) -> Self {
        match self {
            Self::OsPipe(pipe) => Self::OsPipe(pipe.try_clone().unwrap()),
            Self::StdFile(file) => Self::StdFile(file.try_clone().unwrap()),
            Self::Stdout => Self::Stdout,
            Self::Stderr => Self::Stderr,
            Self::Null => Self::Null,
        }
    }
}

impl ShellPipeWriter {
    pub fn stdout() -> Self {
        Self::Stdout
    }

    pub fn stderr() -> Self {
        Self::Stderr
    }

    pub fn null() -> Self {
        Self::Null
    }

    /// Create from a file.
    pub fn from_file(std_file: std::fs::File) -> Self {
        Self::StdFile(std_file)
    }

    /// Convert to process stdio.
    pub fn into_stdio(self) -> std::process::Stdio {
        match self {
            Self::OsPipe(pipe) => pipe.into(),
            Self::StdFile(file) => file.into(),
            Self::Stdout => std::process::Stdio::inherit(),
            Self::Stderr => std::process::Stdio::inherit(),
            Self::Null => std::process::Stdio::null(),
        }
    }

    /// Write all bytes.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        match self {
            Self::OsPipe(pipe) => pipe.write_all(bytes)?,
            Self::StdFile(file) => file.write_all(bytes)?,
            Self::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(bytes)?;
                stdout.flush()?;
            }
            Self::Stderr => {
                let mut stderr = std::io::stderr().lock();
                stderr.write_all(bytes)?;
                stderr.flush()?;
            }
            Self::Null => {}
        }
        Ok(())
    }

    /// Write a line (with newline).
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        let bytes = format!("{line}\n");
        self.write_all(bytes.as_bytes())
    }
}

/// Create a pipe pair.
pub fn pipe() -> (ShellPipeReader, ShellPipeWriter) {
    let (reader, writer) = std::io::pipe().unwrap();
    (
        ShellPipeReader::OsPipe(reader),
        ShellPipeWriter::OsPipe(writer),
    )
}

/// Resolve a path against a base directory unless already absolute.
pub(crate) fn resolve_relative(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_result() {
        let result = ExecuteResult::from_exit_code(0);
        assert_eq!(result.exit_code(), 0);
        assert!(result.should_continue());
        assert!(!ExecuteResult::Exit(2).should_continue());
    }

    #[test]
    fn test_cd_change_updates_pwd() {
        let state = ShellState::new_default();
        state.apply_change(&EnvChange::Cd(PathBuf::from("/")));
        assert_eq!(state.cwd(), PathBuf::from("/"));
        assert_eq!(state.get_env_var("PWD").as_deref(), Some("/"));
    }

    #[test]
    fn test_set_env_var_change_reaches_state() {
        // The seam host commands use to export variables
        let state = ShellState::new_default();
        state.apply_change(&EnvChange::SetEnvVar("GREETING".into(), "hi".into()));
        assert_eq!(state.get_env_var("GREETING").as_deref(), Some("hi"));
    }

    #[test]
    fn test_search_path_override_wins() {
        let config = EngineConfig {
            name: "shellish".to_string(),
            path: Some("/override/bin".to_string()),
        };
        let state = ShellState::new(
            config,
            std::env::vars_os().collect(),
            std::env::current_dir().unwrap(),
            HashMap::new(),
        );
        assert_eq!(
            state.search_path().dirs(),
            &[PathBuf::from("/override/bin")]
        );
    }

    #[tokio::test]
    async fn test_pipe_creation() {
        let (reader, mut writer) = pipe();
        writer.write_all(b"hello").unwrap();
        drop(writer);

        let handle = reader.pipe_to_string_handle();
        let result = handle.await.unwrap();
        assert_eq!(result, "hello");
    }
}
