//! FIFO-based broadcast chat rooms.
//!
//! A room is a directory of named pipes under a shared root
//! (`<root>/chatroom-<room>/<user>`). Joining creates your own FIFO; every
//! line you type is fanned out to every other FIFO in the directory, and a
//! reader task drains your own FIFO to stdout. There is no server process:
//! the filesystem is the rendezvous.
//!
//! The whole subsystem plugs into the engine as a registered
//! [`ShellCommand`](shellish_engine::shell::ShellCommand), so
//! `chatroom <room> <user>` runs like any other built-in.

pub mod command;
pub mod config;
pub mod error;
pub mod fanout;
pub mod reader;
pub mod room;

pub use command::ChatCommand;
pub use config::ChatConfig;
pub use error::ChatError;
pub use room::ChatRoom;
