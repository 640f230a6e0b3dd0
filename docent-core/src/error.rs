//! Error types for Docent

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Docent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Docent operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Project directory does not exist
    #[error("Project directory not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A reviewer could not read or parse a file
    #[error("Failed to extract guidance from {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },

    /// The collaborator failed for a single file
    #[error("Generation error: {0}")]
    Generation(String),

    /// The collaborator itself is unusable (authentication, missing executable, ...)
    #[error("Collaborator unusable: {0}")]
    CollaboratorFatal(String),

    /// The shared backend session was initialized with a different backend
    #[error("Session conflict: {0}")]
    SessionConflict(String),

    /// The run was stopped before completion
    #[error("Run aborted: {0}")]
    Aborted(String),

    /// A run-fatal error, with the location it happened at
    #[error("Run aborted while processing {} in {}: {source}", file.display(), dir.display())]
    RunAborted {
        dir: PathBuf,
        file: PathBuf,
        #[source]
        source: Box<Error>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error must stop the whole run rather than a single file
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Error::CollaboratorFatal(_)
                | Error::SessionConflict(_)
                | Error::Aborted(_)
                | Error::RunAborted { .. }
        )
    }
}
