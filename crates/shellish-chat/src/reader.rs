//! Inbox reader task
//!
//! Senders open the FIFO, write one framed message, and close it; the
//! reader therefore sees one open/EOF cycle per message. Each cycle the
//! task reopens the FIFO (blocking until the next sender connects) and
//! prints whatever arrived.

use std::io::Read;
use std::path::{Path, PathBuf};

use shellish_engine::shell::ShellPipeWriter;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Spawn the loop that drains `inbox` to `stdout`.
///
/// Runs until aborted or until the FIFO becomes unreadable. The blocking
/// open sits on a blocking task so the runtime stays responsive.
pub fn spawn_reader(inbox: PathBuf, mut stdout: ShellPipeWriter) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let path = inbox.clone();
            match tokio::task::spawn_blocking(move || read_one(&path)).await {
                Ok(Ok(message)) => {
                    // A writer that opened and closed without sending
                    // anything produces an empty cycle; skip it.
                    let message = message.trim_end_matches('\n');
                    if !message.is_empty() {
                        let _ = stdout.write_line(message);
                    }
                }
                Ok(Err(e)) => {
                    warn!(path = %inbox.display(), error = %e, "inbox read failed");
                    break;
                }
                Err(_) => break,
            }
        }
        debug!(path = %inbox.display(), "reader stopped");
    })
}

/// Block for one sender: open, drain to EOF, close.
fn read_one(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut buf = String::new();
    file.read_to_string(&mut buf)?;
    Ok(buf)
}

/// Release a read-open left pending on the blocking pool after the reader
/// task was aborted mid-cycle.
///
/// A connect-and-close from the write side hands the pending open an
/// immediate EOF. The non-blocking flag makes this a no-op (`ENXIO`) when
/// no open is actually pending.
pub fn unblock_pending_open(inbox: &Path) {
    use std::os::unix::fs::OpenOptionsExt;
    let _ = std::fs::OpenOptions::new()
        .write(true)
        .custom_flags(nix::libc::O_NONBLOCK)
        .open(inbox);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    use nix::sys::stat::Mode;
    use nix::unistd::mkfifo;
    use shellish_engine::shell::pipe;

    #[tokio::test]
    async fn test_reader_prints_each_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("inbox");
        mkfifo(&fifo, Mode::from_bits_truncate(0o666)).unwrap();

        let (capture_reader, capture_writer) = pipe();
        let reader = spawn_reader(fifo.clone(), capture_writer);

        for text in ["[demo] bob: one", "[demo] bob: two"] {
            let fifo = fifo.clone();
            let text = text.to_string();
            tokio::task::spawn_blocking(move || {
                let mut file = std::fs::OpenOptions::new().write(true).open(fifo).unwrap();
                writeln!(file, "{text}").unwrap();
            })
            .await
            .unwrap();
        }

        // Let the second cycle land before tearing the reader down.
        tokio::time::sleep(Duration::from_millis(200)).await;
        reader.abort();
        let _ = reader.await;
        let fifo = fifo.clone();
        tokio::task::spawn_blocking(move || unblock_pending_open(&fifo))
            .await
            .unwrap();

        let captured = capture_reader.pipe_to_string_handle().await.unwrap();
        assert_eq!(captured, "[demo] bob: one\n[demo] bob: two\n");
    }
}
