//! Parsed command and pipeline model
//!
//! The external tokenizer hands the engine a finished [`Pipeline`]: a
//! non-empty, linear, owned sequence of [`Command`] value objects. Owning
//! the stages as a `Vec` (instead of the classic linked chain of heap
//! nodes) keeps teardown trivial and the sequence finite by construction.

use std::path::{Path, PathBuf};

/// Redirect targets declared on one command.
///
/// At most one output mode is intended; when both truncate and append are
/// present, append wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redirects {
    /// `< file` - stdin from an existing file
    pub input: Option<PathBuf>,
    /// `> file` - stdout to a created-or-truncated file
    pub truncate: Option<PathBuf>,
    /// `>> file` - stdout appended to a created-if-absent file
    pub append: Option<PathBuf>,
}

impl Redirects {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.truncate.is_none() && self.append.is_none()
    }
}

/// One pipeline stage: an executable name, its argument vector, redirects,
/// and the background flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Command {
    /// Executable name (bare name or explicit path).
    pub name: String,
    /// Full argument vector; `args[0]` mirrors `name`.
    pub args: Vec<String>,
    pub redirects: Redirects,
    pub background: bool,
}

impl Command {
    /// Create a command with `args[0]` mirroring the name.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            args: vec![name.clone()],
            name,
            redirects: Redirects::default(),
            background: false,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Redirect stdin from a file (`< file`).
    pub fn stdin_file(mut self, path: impl AsRef<Path>) -> Self {
        self.redirects.input = Some(path.as_ref().to_path_buf());
        self
    }

    /// Redirect stdout, truncating (`> file`).
    pub fn stdout_truncate(mut self, path: impl AsRef<Path>) -> Self {
        self.redirects.truncate = Some(path.as_ref().to_path_buf());
        self
    }

    /// Redirect stdout, appending (`>> file`).
    pub fn stdout_append(mut self, path: impl AsRef<Path>) -> Self {
        self.redirects.append = Some(path.as_ref().to_path_buf());
        self
    }

    /// Mark the command to run in the background.
    pub fn background(mut self) -> Self {
        self.background = true;
        self
    }
}

/// A non-empty, linear sequence of commands; stage i's stdout feeds stage
/// i+1's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    commands: Vec<Command>,
}

impl Pipeline {
    /// Build a pipeline from its stages.
    pub fn new(commands: Vec<Command>) -> Self {
        assert!(!commands.is_empty(), "pipeline must have at least one stage");
        Self { commands }
    }

    /// Single-stage pipeline.
    pub fn single(command: Command) -> Self {
        Self::new(vec![command])
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn first(&self) -> &Command {
        &self.commands[0]
    }

    /// A pipeline is detached when any stage carries the background flag
    /// (the tokenizer attaches the trailing `&` to the stage it follows).
    pub fn is_background(&self) -> bool {
        self.commands.iter().any(|c| c.background)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_mirror_name() {
        let cmd = Command::new("echo").arg("hello").arg("world");
        assert_eq!(cmd.name, "echo");
        assert_eq!(cmd.args, vec!["echo", "hello", "world"]);
    }

    #[test]
    fn test_background_flag_hoists_to_pipeline() {
        let pipeline = Pipeline::new(vec![
            Command::new("cat"),
            Command::new("wc").background(),
        ]);
        assert!(pipeline.is_background());
        assert!(!Pipeline::single(Command::new("cat")).is_background());
    }

    #[test]
    #[should_panic(expected = "at least one stage")]
    fn test_empty_pipeline_rejected() {
        let _ = Pipeline::new(Vec::new());
    }

    #[test]
    fn test_redirect_builders() {
        let cmd = Command::new("sort")
            .stdin_file("/tmp/in")
            .stdout_append("/tmp/out");
        assert_eq!(cmd.redirects.input.as_deref(), Some(Path::new("/tmp/in")));
        assert_eq!(cmd.redirects.append.as_deref(), Some(Path::new("/tmp/out")));
        assert!(cmd.redirects.truncate.is_none());
        assert!(!cmd.redirects.is_empty());
    }
}
