//! Engine error taxonomy
//!
//! Resolution and redirection failures are scoped to a single pipeline
//! stage: the orchestrator turns them into a diagnostic line plus a stage
//! status and they never leave the pipeline call as `Err`. Only a spawn
//! failure aborts the whole pipeline attempt.

use std::io;
use std::path::PathBuf;

/// Errors raised while realizing a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No search-path entry yielded an executable for the name.
    #[error("{name}: command not found")]
    Resolution { name: String },

    /// A redirect target could not be opened in the required mode.
    #[error("cannot open {path}: {source}")]
    Redirection {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Process creation failed at the OS level. Descriptor bookkeeping for
    /// the attempt cannot safely continue, so this aborts the pipeline.
    #[error("failed to spawn {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Exit status reported for a stage that failed with this error.
    pub fn stage_status(&self) -> i32 {
        match self {
            EngineError::Resolution { .. } => 127,
            EngineError::Redirection { .. } => 1,
            EngineError::Spawn { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_status() {
        let err = EngineError::Resolution {
            name: "frobnicate".to_string(),
        };
        assert_eq!(err.stage_status(), 127);
        assert_eq!(err.to_string(), "frobnicate: command not found");
    }

    #[test]
    fn test_redirection_message_is_distinct() {
        let err = EngineError::Redirection {
            path: PathBuf::from("/no/such/file"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot open"));
        assert!(!err.to_string().contains("command not found"));
    }
}
