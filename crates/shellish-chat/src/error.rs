//! Chat error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by room management and message delivery.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The room directory could not be created.
    #[error("cannot create room {room}: {source}")]
    Join {
        room: String,
        #[source]
        source: io::Error,
    },

    /// The participant's own FIFO could not be created.
    #[error("cannot create inbox {path}: {source}")]
    Inbox {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The room directory could not be listed.
    #[error("cannot list room participants: {source}")]
    Enumerate {
        #[source]
        source: io::Error,
    },

    /// No reader appeared on a recipient's FIFO before the deadline.
    #[error("no reader on {user}'s inbox after {timeout_ms} ms")]
    OpenTimeout { user: String, timeout_ms: u64 },

    /// The recipient's FIFO was open but the write failed.
    #[error("delivery to {user} failed: {source}")]
    Delivery {
        user: String,
        #[source]
        source: io::Error,
    },
}
