//! Per-stage stream planning and redirection
//!
//! Computing which source feeds a stage's stdin/stdout is pure and happens
//! before anything is opened; opening is the separate fallible step so a
//! bad redirect aborts only the affected stage, before it ever spawns.
//!
//! User redirections override the default pipe endpoints only at the first
//! stage's stdin and the last stage's stdout; a redirect declared on an
//! interior stage loses to the connecting pipe.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::EngineError;

use super::pipeline::Command;

/// Source feeding a stage's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputPlan {
    /// The stdin handed to the pipeline (first stage, no redirect)
    Inherit,
    /// Read end of the pipe from the previous stage
    UpstreamPipe,
    /// `< file` - must pre-exist
    File(PathBuf),
}

/// Sink receiving a stage's stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPlan {
    /// The stdout handed to the pipeline (last stage, no redirect)
    Inherit,
    /// Write end of the pipe to the next stage
    DownstreamPipe,
    /// `> file` - create or truncate
    Truncate(PathBuf),
    /// `>> file` - create if absent, write at end
    Append(PathBuf),
}

/// The computed stream wiring for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPlan {
    pub stdin: InputPlan,
    pub stdout: OutputPlan,
}

impl StreamPlan {
    /// Compute the plan for stage `index` of `stage_count`.
    ///
    /// Redirect paths are resolved against `cwd` so the stage sees the
    /// shell's working directory, not the host process's.
    pub fn for_stage(command: &Command, index: usize, stage_count: usize, cwd: &Path) -> Self {
        let last = index + 1 == stage_count;

        let stdin = if index == 0 {
            match &command.redirects.input {
                Some(path) => InputPlan::File(super::types::resolve_relative(path, cwd)),
                None => InputPlan::Inherit,
            }
        } else {
            InputPlan::UpstreamPipe
        };

        let stdout = if last {
            // Append wins when both output modes are declared
            match (&command.redirects.append, &command.redirects.truncate) {
                (Some(path), _) => OutputPlan::Append(super::types::resolve_relative(path, cwd)),
                (None, Some(path)) => {
                    OutputPlan::Truncate(super::types::resolve_relative(path, cwd))
                }
                (None, None) => OutputPlan::Inherit,
            }
        } else {
            OutputPlan::DownstreamPipe
        };

        Self { stdin, stdout }
    }
}

impl InputPlan {
    /// Open the redirect file, if the plan names one.
    pub fn open(&self) -> Result<Option<File>, EngineError> {
        match self {
            InputPlan::File(path) => {
                // Read-only; the file must pre-exist
                let file = File::open(path).map_err(|source| EngineError::Redirection {
                    path: path.clone(),
                    source,
                })?;
                Ok(Some(file))
            }
            _ => Ok(None),
        }
    }
}

impl OutputPlan {
    /// Open the redirect file, if the plan names one.
    pub fn open(&self) -> Result<Option<File>, EngineError> {
        let opened = match self {
            OutputPlan::Truncate(path) => Some((path, File::create(path))),
            OutputPlan::Append(path) => Some((
                path,
                OpenOptions::new().append(true).create(true).open(path),
            )),
            _ => None,
        };

        match opened {
            Some((path, result)) => {
                let file = result.map_err(|source| EngineError::Redirection {
                    path: path.clone(),
                    source,
                })?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }
}
