//! Process orchestration
//!
//! Realizes a parsed pipeline as OS processes: one child per stage, N-1
//! anonymous pipes chaining stage i's stdout to stage i+1's stdin, a
//! foreground wait that reaps every child in any completion order, and a
//! detach path that registers children with the background registry.
//!
//! Descriptor discipline: each pipe half is moved into exactly one child's
//! stdio (or dropped when a stage fails before spawning), so after the
//! spawn loop the parent retains no pipe descriptors and EOF propagates as
//! soon as a writer exits.

use std::process::Stdio;
use std::rc::Rc;

use futures::future::Either;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::EngineError;

use super::pipeline::{Command, Pipeline};
use super::streams::{InputPlan, OutputPlan, StreamPlan};
use super::types::{ExecuteResult, ShellPipeReader, ShellPipeWriter, ShellState};
use super::ShellCommandContext;

/// Execute a pipeline against the host process's own standard streams.
pub async fn execute(
    pipeline: Pipeline,
    state: Rc<ShellState>,
) -> Result<ExecuteResult, EngineError> {
    execute_with_stdio(
        pipeline,
        state,
        ShellPipeReader::stdin(),
        ShellPipeWriter::stdout(),
        ShellPipeWriter::stderr(),
    )
    .await
}

/// Execute a pipeline with explicit stdin/stdout/stderr.
///
/// Stage-local failures (resolution, redirection) become one diagnostic
/// line plus a stage status; only an OS-level spawn failure is returned as
/// `Err`, aborting the attempt. Env changes from built-ins are applied to
/// `state` before returning, so `cd` persists across calls.
pub async fn execute_with_stdio(
    pipeline: Pipeline,
    state: Rc<ShellState>,
    stdin: ShellPipeReader,
    stdout: ShellPipeWriter,
    mut stderr: ShellPipeWriter,
) -> Result<ExecuteResult, EngineError> {
    // Built-ins are intercepted before any spawn, and only outside of
    // multi-stage pipelines: they mutate the parent's state or end the loop.
    if pipeline.len() == 1 {
        let command = pipeline.first();

        if command.name.is_empty() {
            return Ok(ExecuteResult::from_exit_code(0));
        }

        if let Some(builtin) = state.resolve_custom_command(&command.name) {
            let context = ShellCommandContext {
                args: command.args.clone(),
                state: (*state).clone(),
                stdin,
                stdout,
                stderr,
            };
            let result = builtin.execute(context).await;
            if let ExecuteResult::Continue(_, changes) = &result {
                state.apply_changes(changes);
            }
            return Ok(result);
        }
    }

    execute_external_pipeline(pipeline, state, stdin, stdout, &mut stderr).await
}

/// A stage after the spawn loop: either a running child or a status that
/// was decided without spawning.
enum Stage {
    Spawned(tokio::process::Child),
    Failed(i32),
}

async fn execute_external_pipeline(
    pipeline: Pipeline,
    state: Rc<ShellState>,
    stdin: ShellPipeReader,
    stdout: ShellPipeWriter,
    stderr: &mut ShellPipeWriter,
) -> Result<ExecuteResult, EngineError> {
    let stage_count = pipeline.len();
    let background = pipeline.is_background();
    let cwd = state.cwd();

    let mut stdin_slot = Some(stdin);
    let mut stdout_slot = Some(stdout);
    let mut upstream: Option<std::io::PipeReader> = None;
    let mut stages: Vec<Stage> = Vec::with_capacity(stage_count);

    for (index, command) in pipeline.commands().iter().enumerate() {
        let last = index + 1 == stage_count;

        // Pipe feeding the next stage. Created up front so that when this
        // stage fails locally, dropping the write end still delivers EOF
        // downstream.
        let (downstream_reader, downstream_writer) = if last {
            (None, None)
        } else {
            let (reader, writer) =
                std::io::pipe().map_err(|source| EngineError::Spawn {
                    name: command.name.clone(),
                    source,
                })?;
            (Some(reader), Some(writer))
        };

        let stage = spawn_stage(
            command,
            index,
            stage_count,
            &state,
            &cwd,
            &mut stdin_slot,
            &mut stdout_slot,
            upstream.take(),
            downstream_writer,
            stderr,
        )?;
        stages.push(stage);
        upstream = downstream_reader;
    }

    // The parent holds no stream ends past this point; children own them.
    drop(stdin_slot);
    drop(stdout_slot);

    if background {
        for stage in stages {
            if let Stage::Spawned(mut child) = stage {
                let pid = child.id();
                let handle = tokio::spawn(async move { wait_status(&mut child).await });
                state.background().register(pid, handle);
            }
        }
        return Ok(ExecuteResult::from_exit_code(0));
    }

    // Foreground: reap every child, in whatever order they finish. The
    // pipeline reports the last stage's status.
    let waits = stages.into_iter().map(|stage| match stage {
        Stage::Spawned(mut child) => {
            Either::Left(async move { wait_status(&mut child).await })
        }
        Stage::Failed(code) => Either::Right(std::future::ready(code)),
    });
    let codes = futures::future::join_all(waits).await;
    let code = codes.last().copied().unwrap_or(0);
    debug!(code, "pipeline finished");
    Ok(ExecuteResult::from_exit_code(code))
}

#[allow(clippy::too_many_arguments)]
fn spawn_stage(
    command: &Command,
    index: usize,
    stage_count: usize,
    state: &ShellState,
    cwd: &std::path::Path,
    stdin_slot: &mut Option<ShellPipeReader>,
    stdout_slot: &mut Option<ShellPipeWriter>,
    upstream: Option<std::io::PipeReader>,
    downstream: Option<std::io::PipeWriter>,
    stderr: &mut ShellPipeWriter,
) -> Result<Stage, EngineError> {
    if command.name.is_empty() {
        return Ok(Stage::Failed(0));
    }

    let plan = StreamPlan::for_stage(command, index, stage_count, cwd);

    // Resolution happens per stage against a fresh search-path snapshot. A
    // miss is fatal only to this stage; the unused pipe halves are dropped
    // on return, which is what hands EOF to the neighbors.
    let path = match state.search_path().resolve(&command.name, cwd) {
        Some(path) => path,
        None => {
            let err = EngineError::Resolution {
                name: command.name.clone(),
            };
            let _ = stderr.write_line(&format!("{}: {}", state.name(), err));
            debug!(name = %command.name, "resolution failed");
            return Ok(Stage::Failed(err.stage_status()));
        }
    };

    // Redirect opens are fatal only to this stage too, before it spawns,
    // and carry a diagnosis distinct from "command not found".
    let (input_file, output_file) = match plan.stdin.open().and_then(|i| {
        let o = plan.stdout.open()?;
        Ok((i, o))
    }) {
        Ok(files) => files,
        Err(err) => {
            let _ = stderr.write_line(&format!("{}: {}", state.name(), err));
            return Ok(Stage::Failed(err.stage_status()));
        }
    };

    let stdin_stdio: Stdio = match plan.stdin {
        InputPlan::Inherit => stdin_slot
            .take()
            .expect("pipeline stdin consumed once, by the first stage")
            .into_stdio(),
        InputPlan::UpstreamPipe => upstream
            .expect("upstream pipe exists for every stage after the first")
            .into(),
        InputPlan::File(_) => input_file
            .expect("input plan with a file always opens one")
            .into(),
    };

    let stdout_stdio: Stdio = match plan.stdout {
        OutputPlan::Inherit => stdout_slot
            .take()
            .expect("pipeline stdout consumed once, by the last stage")
            .into_stdio(),
        OutputPlan::DownstreamPipe => downstream
            .expect("downstream pipe exists for every stage before the last")
            .into(),
        OutputPlan::Truncate(_) | OutputPlan::Append(_) => output_file
            .expect("output plan with a file always opens one")
            .into(),
    };

    let mut cmd = TokioCommand::new(&path);
    cmd.args(&command.args[1..]);
    cmd.current_dir(cwd);
    cmd.env_clear();
    cmd.envs(state.env_vars());
    cmd.stdin(stdin_stdio);
    cmd.stdout(stdout_stdio);
    cmd.stderr(stderr.clone().into_stdio());

    match cmd.spawn() {
        Ok(child) => {
            debug!(stage = index, pid = ?child.id(), path = %path.display(), "spawned stage");
            Ok(Stage::Spawned(child))
        }
        Err(source) => Err(EngineError::Spawn {
            name: command.name.clone(),
            source,
        }),
    }
}

/// Wait for a child and fold its termination into an exit status.
async fn wait_status(child: &mut tokio::process::Child) -> i32 {
    match child.wait().await {
        Ok(status) => status.code().unwrap_or(1),
        Err(e) => {
            debug!(error = %e, "wait failed");
            1
        }
    }
}
