//! Remote branch resolution
//!
//! Places HEAD on a local branch tracking `origin/<branch>` when the remote
//! has it. A missing remote branch is an expected outcome, reported through
//! [`RemoteBranch::found_remote`] rather than an error.

use git2::build::CheckoutBuilder;
use git2::{Oid, Reference};

use super::repo::GitRepo;
use crate::{Error, Result};

/// Remote every publish run clones from and pushes to
pub const DEFAULT_REMOTE: &str = "origin";

/// Outcome of resolving a branch against the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteBranch {
    /// Whether `origin/<branch>` exists
    pub found_remote: bool,
    /// Commit checked out, `None` when the remote branch is absent
    pub start: Option<Oid>,
}

impl RemoteBranch {
    fn not_found() -> Self {
        Self {
            found_remote: false,
            start: None,
        }
    }
}

/// Short branch name, accepting a full `refs/heads/` name as well
///
/// Names in any other `refs/` namespace are rejected, as are names git
/// would refuse for a branch.
pub fn branch_name(branch: &str) -> Result<&str> {
    let short = branch.strip_prefix("refs/heads/").unwrap_or(branch);
    let valid = !short.is_empty()
        && !short.starts_with("refs/")
        && Reference::is_valid_name(&local_ref(short));
    if !valid {
        return Err(Error::InvalidRefName(branch.to_string()));
    }
    Ok(short)
}

/// Full local ref name for a branch
pub fn local_ref(branch: &str) -> String {
    format!("refs/heads/{}", branch)
}

/// Full remote-tracking ref name for a branch on [`DEFAULT_REMOTE`]
pub fn remote_ref(branch: &str) -> String {
    format!("refs/remotes/{}/{}", DEFAULT_REMOTE, branch)
}

impl GitRepo {
    /// Force-checkout the local branch tracking `origin/<branch>`
    ///
    /// Creates the local branch at the remote commit if it does not exist
    /// yet, then overwrites the working tree and index with its tree and
    /// points HEAD at it.
    pub fn checkout_remote_branch(&self, branch: &str) -> Result<RemoteBranch> {
        let branch = branch_name(branch)?;
        let remote_name = remote_ref(branch);
        let local_name = local_ref(branch);

        let Some(remote) = self.find_ref(&remote_name)? else {
            return Ok(RemoteBranch::not_found());
        };
        let remote_commit = remote
            .peel_to_commit()
            .map_err(|e| Error::git(format!("resolving {}", remote_name), e))?;

        if self.find_ref(&local_name)?.is_none() {
            let mut created = self
                .inner()
                .branch(branch, &remote_commit, false)
                .map_err(|e| Error::git(format!("creating branch {}", branch), e))?;
            created
                .set_upstream(Some(&format!("{}/{}", DEFAULT_REMOTE, branch)))
                .map_err(|e| Error::git(format!("setting upstream of {}", branch), e))?;
        }

        let target = self
            .inner()
            .find_reference(&local_name)
            .and_then(|r| r.peel_to_commit())
            .map_err(|e| Error::git(format!("resolving {}", local_name), e))?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.inner()
            .checkout_tree(target.as_object(), Some(&mut checkout))
            .map_err(|e| Error::git(format!("checking out {}", branch), e))?;
        self.inner()
            .set_head(&local_name)
            .map_err(|e| Error::git(format!("pointing HEAD at {}", local_name), e))?;

        tracing::debug!(branch = %branch, commit = %target.id(), "Checked out remote branch");

        Ok(RemoteBranch {
            found_remote: true,
            start: Some(target.id()),
        })
    }
}
