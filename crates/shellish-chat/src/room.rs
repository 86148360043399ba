//! Room membership over the filesystem
//!
//! A room is a directory named `chatroom-<room>` and a participant is a
//! FIFO inside it named after the user. Presence is purely a matter of the
//! FIFO existing; leaving a stale FIFO behind means messages addressed to
//! it wait out the delivery deadline.

use std::fs;
use std::path::{Path, PathBuf};

use nix::sys::stat::Mode;
use nix::unistd::mkfifo;
use tracing::debug;

use crate::error::ChatError;

/// One participant's view of a room.
#[derive(Debug, Clone)]
pub struct ChatRoom {
    room: String,
    user: String,
    dir: PathBuf,
    inbox: PathBuf,
}

impl ChatRoom {
    /// Describe a room under `root` without touching the filesystem.
    pub fn new(root: &Path, room: &str, user: &str) -> Self {
        let dir = root.join(format!("chatroom-{room}"));
        let inbox = dir.join(user);
        Self {
            room: room.to_string(),
            user: user.to_string(),
            dir,
            inbox,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// The room directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// This participant's own FIFO.
    pub fn inbox(&self) -> &Path {
        &self.inbox
    }

    /// Another participant's FIFO in the same room.
    pub fn inbox_of(&self, user: &str) -> PathBuf {
        self.dir.join(user)
    }

    /// Create the room directory and this participant's FIFO.
    ///
    /// Idempotent: an existing directory or FIFO is treated as already
    /// joined, so rejoining after a crash works.
    pub fn join(&self) -> Result<(), ChatError> {
        fs::create_dir_all(&self.dir).map_err(|source| ChatError::Join {
            room: self.room.clone(),
            source,
        })?;

        match mkfifo(&self.inbox, Mode::from_bits_truncate(0o666)) {
            Ok(()) => {
                debug!(path = %self.inbox.display(), "created inbox");
                Ok(())
            }
            Err(nix::errno::Errno::EEXIST) => Ok(()),
            Err(errno) => Err(ChatError::Inbox {
                path: self.inbox.clone(),
                source: std::io::Error::from_raw_os_error(errno as i32),
            }),
        }
    }

    /// Everyone currently in the room, excluding this participant.
    pub fn participants(&self) -> Result<Vec<String>, ChatError> {
        let entries =
            fs::read_dir(&self.dir).map_err(|source| ChatError::Enumerate { source })?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ChatError::Enumerate { source })?;
            if let Ok(name) = entry.file_name().into_string() {
                if name != self.user {
                    names.push(name);
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Frame a message the way it appears on recipients' terminals.
    pub fn format_message(&self, text: &str) -> String {
        format!("[{}] {}: {}", self.room, self.user, text)
    }
}
