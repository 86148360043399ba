//! Exit command implementation
//!
//! Ends the interactive loop with an optional status.

use super::{ShellCommand, ShellCommandContext};
use crate::shell::types::{ExecuteResult, FutureExecuteResult};

/// The `exit` command - terminates the interactive loop.
pub struct ExitCommand;

impl ShellCommand for ExitCommand {
    fn execute(&self, mut context: ShellCommandContext) -> FutureExecuteResult {
        Box::pin(async move {
            match context.args.get(1) {
                None => ExecuteResult::Exit(0),
                Some(arg) => match arg.parse::<i32>() {
                    Ok(code) => ExecuteResult::Exit(code),
                    Err(_) => {
                        let _ = context.write_diagnostic(&format!(
                            "exit: {arg}: numeric argument required"
                        ));
                        ExecuteResult::Exit(2)
                    }
                },
            }
        })
    }
}
