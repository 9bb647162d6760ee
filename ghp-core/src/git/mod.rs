//! Git operations for ghp
//!
//! This module provides the repository handle, remote branch resolution,
//! orphan branch creation, and clone/push plumbing.

mod orphan;
mod refs;
mod remote;
mod repo;

#[cfg(test)]
pub(crate) mod fixtures;

pub use orphan::{HeadUpdate, OrphanBranch, OrphanCreated, StartPoint};
pub use refs::{branch_name, local_ref, remote_ref, RemoteBranch, DEFAULT_REMOTE};
pub use remote::clone_without_checkout;
pub use repo::GitRepo;
