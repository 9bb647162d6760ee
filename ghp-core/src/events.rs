//! Progress reporting for publish runs
//!
//! The workspace never logs directly. It reports [`PublishEvent`]s through an
//! [`EventSink`], so callers choose where progress goes: [`TracingSink`] for
//! the CLI, a closure collecting into a `Vec` for tests.

use std::path::PathBuf;

use git2::Oid;

/// A progress step or non-fatal condition during a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishEvent {
    /// Cloning the remote repository
    Cloning { uri: String },
    /// Checking out an existing remote branch
    CheckingOut { branch: String },
    /// The remote branch does not exist; an orphan branch will be created
    BranchNotFound { branch: String },
    /// Creating a new orphan branch
    CreatingOrphan { branch: String },
    /// Removing tracked content from the content directory
    ClearingContent { dir: PathBuf },
    /// Copying content into the content directory
    CopyingContent { from: PathBuf, to: PathBuf },
    /// Staging the workspace contents
    Staging,
    /// Nothing found to stage; commit and push skipped
    NothingToAdd,
    /// Staged tree matches the branch tip; commit and push skipped
    Unchanged,
    /// A commit was created
    Committed { commit: Oid },
    /// Pushing the branch to the remote
    Pushing { branch: String, uri: String },
}

impl PublishEvent {
    /// Whether this event describes a condition worth a warning
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            PublishEvent::BranchNotFound { .. }
                | PublishEvent::NothingToAdd
                | PublishEvent::Unchanged
        )
    }
}

impl std::fmt::Display for PublishEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishEvent::Cloning { uri } => write!(f, "Cloning remote repository at \"{}\"", uri),
            PublishEvent::CheckingOut { branch } => {
                write!(f, "Checking out remote branch \"{}\"", branch)
            }
            PublishEvent::BranchNotFound { branch } => {
                write!(f, "Remote branch \"{}\" not found", branch)
            }
            PublishEvent::CreatingOrphan { branch } => {
                write!(f, "Creating new orphan branch \"{}\"", branch)
            }
            PublishEvent::ClearingContent { dir } => {
                write!(f, "Clearing content directory \"{}\"", dir.display())
            }
            PublishEvent::CopyingContent { from, to } => write!(
                f,
                "Copying content from \"{}\" to \"{}\"",
                from.display(),
                to.display()
            ),
            PublishEvent::Staging => write!(f, "Adding directory contents to git"),
            PublishEvent::NothingToAdd => write!(f, "Nothing to add"),
            PublishEvent::Unchanged => write!(f, "Content unchanged, nothing to commit"),
            PublishEvent::Committed { commit } => write!(f, "Created commit {}", commit),
            PublishEvent::Pushing { branch, uri } => {
                write!(f, "Pushing changes to remote branch \"{}\" at \"{}\"", branch, uri)
            }
        }
    }
}

/// Receiver for publish progress
pub trait EventSink {
    /// Handle one event
    fn report(&self, event: &PublishEvent);
}

impl<F> EventSink for F
where
    F: Fn(&PublishEvent),
{
    fn report(&self, event: &PublishEvent) {
        self(event)
    }
}

/// Sink that writes events as `tracing` log lines
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn report(&self, event: &PublishEvent) {
        if event.is_warning() {
            tracing::warn!("{}", event);
        } else {
            tracing::info!("{}", event);
        }
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn report(&self, _event: &PublishEvent) {}
}
