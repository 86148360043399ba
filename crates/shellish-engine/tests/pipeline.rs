//! End-to-end pipeline tests against real processes.

use std::rc::Rc;
use std::time::{Duration, Instant};

use shellish_engine::shell::{
    execute_with_stdio, pipe, Command, ExecuteResult, Pipeline, ShellPipeReader, ShellPipeWriter,
    ShellState,
};

fn state() -> Rc<ShellState> {
    Rc::new(ShellState::new_default())
}

/// Run a pipeline with stdout captured through a pipe.
async fn run_captured(pipeline: Pipeline, state: Rc<ShellState>) -> (ExecuteResult, String) {
    let (reader, writer) = pipe();
    let capture = reader.pipe_to_string_handle();
    let result = execute_with_stdio(
        pipeline,
        state,
        ShellPipeReader::stdin(),
        writer,
        ShellPipeWriter::null(),
    )
    .await
    .unwrap();
    (result, capture.await.unwrap())
}

#[tokio::test]
async fn two_stage_pipe_crosses_bytes_in_order() {
    let pipeline = Pipeline::new(vec![
        Command::new("printf").arg("one\\ntwo\\nthree\\n"),
        Command::new("cat"),
    ]);
    let (result, out) = run_captured(pipeline, state()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(out, "one\ntwo\nthree\n");
}

#[tokio::test]
async fn three_stage_pipeline_generalizes_wiring() {
    let pipeline = Pipeline::new(vec![
        Command::new("printf").arg("b\\na\\nb\\n"),
        Command::new("sort"),
        Command::new("uniq"),
    ]);
    let (result, out) = run_captured(pipeline, state()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(out, "a\nb\n");
}

#[tokio::test]
async fn downstream_sees_eof_when_upstream_stage_fails() {
    // First stage never resolves; cat must still see EOF and exit instead
    // of hanging on a pipe that nobody writes.
    let pipeline = Pipeline::new(vec![
        Command::new("no-such-command-55821"),
        Command::new("cat"),
    ]);
    let (result, out) = run_captured(pipeline, state()).await;
    // Last stage (cat) succeeded on an empty stream
    assert_eq!(result.exit_code(), 0);
    assert_eq!(out, "");
}

#[tokio::test]
async fn pipeline_reports_last_stage_status() {
    let pipeline = Pipeline::new(vec![
        Command::new("printf").arg("x"),
        Command::new("sh").arg("-c").arg("cat >/dev/null; exit 3"),
    ]);
    let (result, _) = run_captured(pipeline, state()).await;
    assert_eq!(result.exit_code(), 3);
}

#[tokio::test]
async fn truncate_redirect_creates_and_replaces() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");
    std::fs::write(&target, "stale stale stale").unwrap();

    let pipeline = Pipeline::single(
        Command::new("printf").arg("fresh\\n").stdout_truncate(&target),
    );
    let (result, _) = run_captured(pipeline, state()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "fresh\n");
}

#[tokio::test]
async fn append_redirect_preserves_prior_content() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("log.txt");

    for word in ["first", "second"] {
        let pipeline = Pipeline::single(
            Command::new("printf")
                .arg(format!("{word}\\n"))
                .stdout_append(&target),
        );
        let (result, _) = run_captured(pipeline, state()).await;
        assert_eq!(result.exit_code(), 0);
    }
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "first\nsecond\n"
    );
}

#[tokio::test]
async fn input_redirect_feeds_stdin() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("in.txt");
    std::fs::write(&source, "from the file\n").unwrap();

    let pipeline = Pipeline::single(Command::new("cat").stdin_file(&source));
    let (result, out) = run_captured(pipeline, state()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(out, "from the file\n");
}

#[tokio::test]
async fn missing_input_redirect_aborts_stage_before_spawn() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.txt");

    let (stderr_reader, stderr_writer) = pipe();
    let capture = stderr_reader.pipe_to_string_handle();
    let pipeline = Pipeline::single(Command::new("cat").stdin_file(&missing));
    let result = execute_with_stdio(
        pipeline,
        state(),
        ShellPipeReader::stdin(),
        ShellPipeWriter::null(),
        stderr_writer,
    )
    .await
    .unwrap();

    assert_eq!(result.exit_code(), 1);
    let diagnostic = capture.await.unwrap();
    assert!(diagnostic.starts_with("shellish: cannot open"));
    assert!(!diagnostic.contains("command not found"));
}

#[tokio::test]
async fn background_pipeline_returns_without_blocking() {
    let shell = state();
    let pipeline = Pipeline::single(Command::new("sleep").arg("0.5").background());

    let started = Instant::now();
    let result = execute_with_stdio(
        pipeline,
        shell.clone(),
        ShellPipeReader::stdin(),
        ShellPipeWriter::null(),
        ShellPipeWriter::null(),
    )
    .await
    .unwrap();
    assert_eq!(result.exit_code(), 0);
    assert!(
        started.elapsed() < Duration::from_millis(400),
        "background launch must not wait for the child"
    );
    assert_eq!(shell.background().len(), 1);

    let reaped = shell.background().wait_all().await;
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].exit_code, 0);
    assert!(shell.background().is_empty());
}

#[tokio::test]
async fn background_jobs_reap_opportunistically() {
    let shell = state();
    let pipeline = Pipeline::single(Command::new("true").background());
    let result = execute_with_stdio(
        pipeline,
        shell.clone(),
        ShellPipeReader::stdin(),
        ShellPipeWriter::null(),
        ShellPipeWriter::null(),
    )
    .await
    .unwrap();
    assert_eq!(result.exit_code(), 0);

    // The child is trivially fast; give its wait task a moment to finish.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let reaped = shell.background().reap_finished().await;
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].exit_code, 0);
}

#[tokio::test]
async fn relative_path_resolves_against_shell_cwd() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let tool = dir.path().join("tool");
    std::fs::write(&tool, "#!/bin/sh\necho ran-from-shell-cwd\n").unwrap();
    std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).unwrap();

    let shell = state();
    let pipeline = Pipeline::single(Command::new("cd").arg(dir.path().to_str().unwrap()));
    let (result, _) = run_captured(pipeline, shell.clone()).await;
    assert_eq!(result.exit_code(), 0);

    // `./tool` exists in the shell's cwd, not the host process's
    let pipeline = Pipeline::single(Command::new("./tool"));
    let (result, out) = run_captured(pipeline, shell.clone()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(out.trim_end(), "ran-from-shell-cwd");
}

#[tokio::test]
async fn cd_persists_across_commands() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let shell = state();

    let pipeline = Pipeline::single(Command::new("cd").arg(dir.path().to_str().unwrap()));
    let (result, _) = run_captured(pipeline, shell.clone()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(shell.cwd(), canonical);

    // A later child observes the changed directory
    let pipeline = Pipeline::single(Command::new("pwd"));
    let (_, out) = run_captured(pipeline, shell.clone()).await;
    assert_eq!(out.trim_end(), canonical.to_str().unwrap());
}

#[tokio::test]
async fn failed_cd_leaves_cwd_untouched() {
    let shell = state();
    let before = shell.cwd();

    let (stderr_reader, stderr_writer) = pipe();
    let capture = stderr_reader.pipe_to_string_handle();
    let pipeline = Pipeline::single(Command::new("cd").arg("/no/such/dir/81235"));
    let result = execute_with_stdio(
        pipeline,
        shell.clone(),
        ShellPipeReader::stdin(),
        ShellPipeWriter::null(),
        stderr_writer,
    )
    .await
    .unwrap();

    assert_eq!(result.exit_code(), 1);
    assert_eq!(shell.cwd(), before);
    assert!(capture.await.unwrap().contains("cd:"));
}

#[tokio::test]
async fn exit_with_status_ends_the_loop() {
    let pipeline = Pipeline::single(Command::new("exit").arg("7"));
    let (result, _) = run_captured(pipeline, state()).await;
    assert_eq!(result, ExecuteResult::Exit(7));
    assert!(!result.should_continue());
}

#[tokio::test]
async fn interior_output_redirect_does_not_break_the_pipe() {
    // The truncate target on the first stage of a two-stage pipeline is
    // ignored in favor of the connecting pipe.
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("ignored.txt");

    let pipeline = Pipeline::new(vec![
        Command::new("printf").arg("through\\n").stdout_truncate(&target),
        Command::new("cat"),
    ]);
    let (result, out) = run_captured(pipeline, state()).await;
    assert_eq!(result.exit_code(), 0);
    assert_eq!(out, "through\n");
    assert!(!target.exists());
}
