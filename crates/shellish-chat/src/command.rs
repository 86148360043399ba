//! The `chatroom` shell command
//!
//! Registered with the engine like any built-in. Joins the room, spawns
//! the inbox reader, then turns every line on stdin into a broadcast until
//! stdin reaches EOF.

use shellish_engine::shell::{
    ExecuteResult, FutureExecuteResult, ShellCommand, ShellCommandContext,
};
use tracing::info;

use crate::config::ChatConfig;
use crate::fanout::broadcast;
use crate::reader::{spawn_reader, unblock_pending_open};
use crate::room::ChatRoom;

/// `chatroom <room> <user>` - join a room and chat until stdin ends.
pub struct ChatCommand {
    config: ChatConfig,
}

impl ChatCommand {
    pub fn new(config: ChatConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ChatConfig::default())
    }
}

impl ShellCommand for ChatCommand {
    fn execute(&self, mut context: ShellCommandContext) -> FutureExecuteResult {
        let config = self.config.clone();
        Box::pin(async move {
            if context.args.len() != 3 {
                let _ = context.stderr.write_line("usage: chatroom <room> <user>");
                return ExecuteResult::from_exit_code(1);
            }

            let room = ChatRoom::new(&config.root, &context.args[1], &context.args[2]);
            if let Err(e) = room.join() {
                let _ = context.write_diagnostic(&format!("chatroom: {e}"));
                return ExecuteResult::from_exit_code(1);
            }
            info!(room = room.room(), user = room.user(), "joined");

            let reader = spawn_reader(room.inbox().to_path_buf(), context.stdout.clone());

            // Lines come off stdin on a blocking task and cross to the
            // async side one at a time; channel capacity 1 keeps the pump
            // at most one line ahead of the loop.
            let (line_tx, mut line_rx) = tokio::sync::mpsc::channel::<String>(1);
            let stdin = context.stdin;
            let pump = tokio::task::spawn_blocking(move || {
                use std::io::BufRead;
                for line in std::io::BufReader::new(stdin).lines() {
                    let Ok(line) = line else { break };
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            });

            // Deliveries run detached so one recipient waiting out its
            // open deadline never holds up the next input line. Their
            // failure reports come back through this channel.
            let (report_tx, mut report_rx) = tokio::sync::mpsc::channel::<String>(16);

            let prompt = format!("[{}] {}: ", room.room(), room.user());
            loop {
                let _ = context.stdout.write_all(prompt.as_bytes());
                let line = loop {
                    tokio::select! {
                        line = line_rx.recv() => break line,
                        Some(report) = report_rx.recv() => {
                            let _ = context.stderr.write_line(&report);
                        }
                    }
                };
                let Some(line) = line else { break };

                let room = room.clone();
                let config = config.clone();
                let report_tx = report_tx.clone();
                tokio::spawn(async move {
                    match broadcast(&room, &line, &config).await {
                        Ok(failures) => {
                            for failure in failures {
                                let _ = report_tx
                                    .send(format!("chatroom: {}", failure.error))
                                    .await;
                            }
                        }
                        Err(e) => {
                            let _ = report_tx.send(format!("chatroom: {e}")).await;
                        }
                    }
                });
            }

            // Stdin ended. Let in-flight deliveries finish (each is bounded
            // by the open deadline) and report their failures: the channel
            // closes once the last delivery task drops its sender.
            drop(report_tx);
            while let Some(report) = report_rx.recv().await {
                let _ = context.stderr.write_line(&report);
            }

            // Tear down the reader and release the open it may have pending
            // on the blocking pool.
            reader.abort();
            let _ = reader.await;
            let inbox = room.inbox().to_path_buf();
            let _ = tokio::task::spawn_blocking(move || unblock_pending_open(&inbox)).await;
            let _ = pump.await;
            ExecuteResult::from_exit_code(0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use shellish_engine::shell::{pipe, ShellPipeReader, ShellPipeWriter, ShellState};

    fn run(args: &[&str]) -> ShellCommandContext {
        ShellCommandContext {
            args: args.iter().map(|a| a.to_string()).collect(),
            state: ShellState::new_default(),
            stdin: ShellPipeReader::stdin(),
            stdout: ShellPipeWriter::null(),
            stderr: ShellPipeWriter::null(),
        }
    }

    #[tokio::test]
    async fn test_usage_error_without_args() {
        let command = ChatCommand::with_defaults();
        let (stderr_reader, stderr_writer) = pipe();
        let capture = stderr_reader.pipe_to_string_handle();
        let mut context = run(&["chatroom"]);
        context.stderr = stderr_writer;

        let result = command.execute(context).await;
        assert_eq!(result.exit_code(), 1);
        assert_eq!(capture.await.unwrap(), "usage: chatroom <room> <user>\n");
    }
}
