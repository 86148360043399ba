//! Message fan-out
//!
//! Delivery to each recipient is its own task: one slow or dead FIFO must
//! not hold up the rest of the room. A semaphore caps how many deliveries
//! run at once so a huge room cannot exhaust the blocking pool.
//!
//! The FIFO is opened with `O_NONBLOCK` so a recipient with no reader
//! yields `ENXIO` instead of blocking the sender forever; the open is
//! retried until the configured deadline, then the recipient is reported
//! as unreachable.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use nix::libc;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::ChatConfig;
use crate::error::ChatError;
use crate::room::ChatRoom;

/// How long to wait between open attempts on a FIFO with no reader yet.
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// A recipient that did not receive the message.
#[derive(Debug)]
pub struct DeliveryFailure {
    pub user: String,
    pub error: ChatError,
}

/// Send one message to every other participant in the room.
///
/// Returns the recipients that could not be reached; an empty vector means
/// everyone got the message. Only a failure to enumerate the room at all is
/// an `Err`.
pub async fn broadcast(
    room: &ChatRoom,
    text: &str,
    config: &ChatConfig,
) -> Result<Vec<DeliveryFailure>, ChatError> {
    let recipients = room.participants()?;
    let message = room.format_message(text);
    debug!(room = room.room(), recipients = recipients.len(), "broadcast");

    let limiter = Arc::new(Semaphore::new(config.max_fanout.max(1)));
    let timeout = config.open_timeout();
    let timeout_ms = config.open_timeout_ms;

    let mut deliveries = Vec::with_capacity(recipients.len());
    for user in recipients {
        let inbox = room.inbox_of(&user);
        let message = message.clone();
        let limiter = limiter.clone();
        deliveries.push(tokio::spawn(async move {
            // The semaphore is never closed, so acquisition cannot fail.
            let _permit = limiter.acquire_owned().await.unwrap();
            deliver(&inbox, &user, &message, timeout, timeout_ms)
                .await
                .err()
                .map(|error| DeliveryFailure { user, error })
        }));
    }

    let mut failures = Vec::new();
    for delivery in deliveries {
        if let Ok(Some(failure)) = delivery.await {
            warn!(user = failure.user, error = %failure.error, "delivery failed");
            failures.push(failure);
        }
    }
    Ok(failures)
}

/// Deliver one framed message to one inbox: open, write, close.
async fn deliver(
    inbox: &Path,
    user: &str,
    message: &str,
    timeout: Duration,
    timeout_ms: u64,
) -> Result<(), ChatError> {
    let mut file = open_write_deadline(inbox, user, timeout, timeout_ms).await?;
    let mut payload = message.to_string();
    payload.push('\n');
    let user = user.to_string();
    tokio::task::spawn_blocking(move || file.write_all(payload.as_bytes()))
        .await
        .map_err(|e| ChatError::Delivery {
            user: user.clone(),
            source: std::io::Error::other(e),
        })?
        .map_err(|source| ChatError::Delivery { user, source })
}

/// Open a FIFO for writing, waiting up to `timeout` for a reader.
async fn open_write_deadline(
    inbox: &Path,
    user: &str,
    timeout: Duration,
    timeout_ms: u64,
) -> Result<std::fs::File, ChatError> {
    let deadline = Instant::now() + timeout;
    loop {
        let attempt = {
            let inbox = inbox.to_path_buf();
            tokio::task::spawn_blocking(move || try_open_write(&inbox)).await
        };
        match attempt {
            Ok(Ok(file)) => return Ok(file),
            // ENXIO: the FIFO exists but nobody has it open for reading yet.
            Ok(Err(e)) if e.raw_os_error() == Some(libc::ENXIO) => {
                if Instant::now() >= deadline {
                    return Err(ChatError::OpenTimeout {
                        user: user.to_string(),
                        timeout_ms,
                    });
                }
                tokio::time::sleep(OPEN_RETRY_INTERVAL).await;
            }
            Ok(Err(source)) => {
                return Err(ChatError::Delivery {
                    user: user.to_string(),
                    source,
                })
            }
            Err(e) => {
                return Err(ChatError::Delivery {
                    user: user.to_string(),
                    source: std::io::Error::other(e),
                })
            }
        }
    }
}

fn try_open_write(inbox: &PathBuf) -> std::io::Result<std::fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    std::fs::OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(inbox)
}
