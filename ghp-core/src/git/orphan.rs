//! Orphan branch creation
//!
//! An orphan branch has no ancestor commits: HEAD is linked to a branch name
//! that does not exist yet, so the next commit becomes a root commit. This is
//! what keeps published content on its own history, apart from the project's
//! other branches.
//!
//! Creation runs in four stages, each failing early:
//!
//! 1. validate the name and check that no ref of that name exists
//! 2. resolve the optional start point to a commit
//! 3. check out the start point's tree over the current HEAD tree, aborting
//!    on any path with local changes that would be overwritten
//! 4. link the symbolic HEAD to the new branch
//!
//! A conflict in stage 3 leaves HEAD untouched.

use git2::build::CheckoutBuilder;
use git2::{CheckoutNotificationType, Delta, ErrorCode, Oid, Reference, Tree};

use super::repo::GitRepo;
use crate::{Error, Result};

/// Where the new branch's working tree and index come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPoint {
    /// A specific commit
    Commit(Oid),
    /// A revision expression such as `main` or `HEAD~2`
    Revision(String),
}

/// How HEAD was updated
///
/// An opened repository always has HEAD, so `Forced` is the usual outcome.
/// `Created` is only seen when the HEAD file went missing after the
/// repository was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadUpdate {
    /// HEAD did not exist before
    Created,
    /// An existing HEAD was redirected
    Forced,
}

/// Result of a successful orphan creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanCreated {
    /// Reference that was updated, always `HEAD`
    pub head: String,
    /// Full name of the new (still unborn) branch
    pub branch: String,
    /// How HEAD was updated
    pub update: HeadUpdate,
    /// Commit whose tree was checked out, if a start point was given
    pub start: Option<Oid>,
    /// Paths the checkout removed from the working tree
    pub to_be_deleted: Vec<String>,
}

/// A request to create an orphan branch
///
/// The request is consumed by [`OrphanBranch::create`], so a given request
/// runs at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanBranch {
    name: String,
    start_point: Option<StartPoint>,
}

impl OrphanBranch {
    /// Request an orphan branch called `name` with an empty starting tree
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start_point: None,
        }
    }

    /// Start the branch from the tree of the given commit or revision
    pub fn start_point(mut self, start_point: StartPoint) -> Self {
        self.start_point = Some(start_point);
        self
    }

    /// Full ref name the branch will get
    ///
    /// Names already under `refs/` are kept as is, anything else goes under
    /// `refs/heads/`.
    pub fn ref_name(&self) -> String {
        if self.name.starts_with("refs/") {
            self.name.clone()
        } else {
            format!("refs/heads/{}", self.name)
        }
    }

    /// Create the branch and point HEAD at it
    pub fn create(self, repo: &GitRepo) -> Result<OrphanCreated> {
        let branch = self.validate(repo)?;
        let start = self.resolve_start(repo)?;

        let to_be_deleted = match start {
            Some(oid) => checkout_start(repo, oid)?,
            None => Vec::new(),
        };

        let update = link_head(repo, &branch)?;
        tracing::debug!(branch = %branch, ?update, "Linked HEAD to orphan branch");

        Ok(OrphanCreated {
            head: "HEAD".to_string(),
            branch,
            update,
            start,
            to_be_deleted,
        })
    }

    fn validate(&self, repo: &GitRepo) -> Result<String> {
        if self.name.is_empty() {
            return Err(Error::InvalidRefName("<empty>".to_string()));
        }

        let branch = self.ref_name();
        if !Reference::is_valid_name(&branch) {
            return Err(Error::InvalidRefName(self.name.clone()));
        }

        if repo.find_ref(&branch)?.is_some() {
            return Err(Error::RefAlreadyExists(self.name.clone()));
        }

        Ok(branch)
    }

    fn resolve_start(&self, repo: &GitRepo) -> Result<Option<Oid>> {
        match &self.start_point {
            None => Ok(None),
            Some(StartPoint::Commit(oid)) => Ok(Some(*oid)),
            Some(StartPoint::Revision(spec)) if spec.is_empty() => Ok(None),
            Some(StartPoint::Revision(spec)) => {
                let object = repo.inner().revparse_single(spec).map_err(|e| {
                    if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) {
                        Error::RefNotFound(spec.clone())
                    } else {
                        Error::git(format!("resolving {}", spec), e)
                    }
                })?;
                let commit = object
                    .peel_to_commit()
                    .map_err(|_| Error::RefNotFound(spec.clone()))?;
                Ok(Some(commit.id()))
            }
        }
    }
}

/// Reconcile working tree and index from the HEAD tree to the tree of `start`
///
/// Returns the paths the checkout removes.
fn checkout_start(repo: &GitRepo, start: Oid) -> Result<Vec<String>> {
    let target = repo
        .inner()
        .find_commit(start)
        .and_then(|c| c.tree())
        .map_err(|e| Error::git(format!("reading start commit {}", start), e))?;

    // Baseline is the HEAD tree, or empty while HEAD is unborn
    let baseline = match repo.head_commit()? {
        Some(commit) => Some(
            commit
                .tree()
                .map_err(|e| Error::git("reading HEAD tree", e))?,
        ),
        None => None,
    };

    let to_be_deleted = removed_paths(repo, baseline.as_ref(), &target)?;

    let mut conflicts = Vec::new();
    let mut checkout = CheckoutBuilder::new();
    checkout
        .safe()
        .notify_on(CheckoutNotificationType::CONFLICT);
    checkout.notify(|_kind, path, _baseline, _target, _workdir| {
        if let Some(path) = path {
            conflicts.push(path.to_string_lossy().replace('\\', "/"));
        }
        true
    });
    let result = repo
        .inner()
        .checkout_tree(target.as_object(), Some(&mut checkout));
    drop(checkout);

    match result {
        Ok(()) => Ok(to_be_deleted),
        Err(e) if e.code() == ErrorCode::Conflict || !conflicts.is_empty() => {
            conflicts.sort();
            conflicts.dedup();
            Err(Error::CheckoutConflict { paths: conflicts })
        }
        Err(e) => Err(Error::git(format!("checking out {}", start), e)),
    }
}

/// Paths present in `baseline` but absent from `target`
fn removed_paths(
    repo: &GitRepo,
    baseline: Option<&Tree<'_>>,
    target: &Tree<'_>,
) -> Result<Vec<String>> {
    let Some(baseline) = baseline else {
        return Ok(Vec::new());
    };

    let diff = repo
        .inner()
        .diff_tree_to_tree(Some(baseline), Some(target), None)
        .map_err(|e| Error::git("diffing HEAD against start tree", e))?;

    let removed = diff
        .deltas()
        .filter(|d| d.status() == Delta::Deleted)
        .filter_map(|d| d.old_file().path())
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .collect();
    Ok(removed)
}

fn link_head(repo: &GitRepo, branch: &str) -> Result<HeadUpdate> {
    let update = match repo.find_ref("HEAD")? {
        Some(_) => HeadUpdate::Forced,
        None => HeadUpdate::Created,
    };

    repo.inner()
        .reference_symbolic("HEAD", branch, true, &format!("ghp: orphan branch {}", branch))
        .map_err(|e| Error::UnexpectedRefUpdate {
            reference: "HEAD".to_string(),
            message: e.message().to_string(),
        })?;

    Ok(update)
}
