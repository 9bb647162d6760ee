//! Error types for ghp

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for ghp operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ghp operations
///
/// Branch-not-found and nothing-to-add are not represented here: both are
/// expected outcomes of a publish run, not failures.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration, detected before any git operation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Working directory could not be prepared or the remote could not be cloned
    #[error("Setup failed: {context}: {source}")]
    Setup {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Branch name is empty or not a valid ref name
    #[error("Invalid branch name: {0}")]
    InvalidRefName(String),

    /// A ref with the requested name already exists
    #[error("Ref already exists: {0}")]
    RefAlreadyExists(String),

    /// A start point revision could not be resolved
    #[error("Ref not found: {0}")]
    RefNotFound(String),

    /// Local changes would be overwritten by a checkout
    #[error("Checkout conflict on {} path(s): {}", paths.len(), paths.join(", "))]
    CheckoutConflict { paths: Vec<String> },

    /// HEAD could not be linked to a new branch
    #[error("Unexpected result updating {reference}: {message}")]
    UnexpectedRefUpdate { reference: String, message: String },

    /// Content source directory does not exist
    #[error("No content found at: {}", .0.display())]
    ContentNotFound(PathBuf),

    /// Filesystem error with the path or operation involved
    #[error("IO error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Git operation failed
    #[error("Git error during {op}: {source}")]
    Git {
        op: String,
        #[source]
        source: git2::Error,
    },

    /// Remote refused the pushed reference
    #[error("Push of {reference} rejected: {message}")]
    PushRejected { reference: String, message: String },
}

impl Error {
    /// Wrap a git2 error with the operation that produced it
    pub fn git(op: impl Into<String>, source: git2::Error) -> Self {
        Error::Git {
            op: op.into(),
            source,
        }
    }

    /// Wrap an IO error with the path or operation involved
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// Wrap a setup failure
    pub fn setup(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Setup {
            context: context.into(),
            source: source.into(),
        }
    }
}
