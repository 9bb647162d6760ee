//! ghp core - publish a content directory to a dedicated git branch
//!
//! This crate clones a remote, places HEAD on the publish branch (checking
//! out the existing remote branch or creating an orphan branch with no
//! history), replaces the tracked content, and commits and pushes it.

pub mod config;
pub mod error;
pub mod events;
pub mod git;
pub mod paths;
pub mod workspace;

pub use config::{AuthorConfig, Config, PublishConfig, PublishOverrides};
pub use error::{Error, Result};
pub use events::{EventSink, NullSink, PublishEvent, TracingSink};
pub use git::{GitRepo, HeadUpdate, OrphanBranch, OrphanCreated, RemoteBranch, StartPoint};
pub use workspace::{
    publish_directory, BranchOrigin, PagesWorkspace, PublishOutcome, PublishStage, WorkspaceOptions,
};
