//! Cd command implementation
//!
//! Changes the current working directory of the shell itself, which is why
//! it must run in the parent rather than in a spawned child.

use std::path::PathBuf;

use super::{ShellCommand, ShellCommandContext};
use crate::shell::types::{EnvChange, ExecuteResult, FutureExecuteResult};

/// The `cd` command - changes the current working directory.
pub struct CdCommand;

impl ShellCommand for CdCommand {
    fn execute(&self, mut context: ShellCommandContext) -> FutureExecuteResult {
        Box::pin(async move {
            let target = if context.args.len() > 1 {
                let path = PathBuf::from(&context.args[1]);
                if path.is_absolute() {
                    path
                } else {
                    context.state.cwd().join(path)
                }
            } else {
                // No argument: home directory
                match context.state.home_dir() {
                    Some(home) => home,
                    None => {
                        let _ = context.write_diagnostic("cd: HOME not set");
                        return ExecuteResult::from_exit_code(1);
                    }
                }
            };

            // On any failure the working directory stays untouched
            match std::fs::canonicalize(&target) {
                Ok(canonical) => {
                    if canonical.is_dir() {
                        ExecuteResult::Continue(0, vec![EnvChange::Cd(canonical)])
                    } else {
                        let _ = context.write_diagnostic(&format!(
                            "cd: not a directory: {}",
                            target.display()
                        ));
                        ExecuteResult::from_exit_code(1)
                    }
                }
                Err(e) => {
                    let _ = context
                        .write_diagnostic(&format!("cd: {}: {}", target.display(), e));
                    ExecuteResult::from_exit_code(1)
                }
            }
        })
    }
}
