//! Publishing workspace
//!
//! A [`PagesWorkspace`] owns one fresh clone of the remote and walks it
//! through a single publish run:
//!
//! ```text
//! Uninitialized -> Cloned -> BranchResolved{Existing|Orphan}
//!   -> ContentCleared -> ContentStaged -> Committed -> Pushed
//! ```
//!
//! Every fatal error stops the run where it happened. Two conditions are not
//! errors: a missing remote branch (an orphan branch is created instead) and
//! an empty workspace at publish time ([`PublishOutcome::NothingToAdd`]).

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use git2::{IndexAddOption, Oid, Signature};

use crate::config::{AuthorConfig, PublishConfig};
use crate::events::{EventSink, PublishEvent};
use crate::git::{branch_name, clone_without_checkout, GitRepo, OrphanBranch};
use crate::paths::{self, GIT_DIR};
use crate::{Error, Result};

/// Settings for opening a workspace
#[derive(Debug, Clone)]
pub struct WorkspaceOptions {
    /// Repository to clone and push to
    pub uri: String,
    /// Directory the remote is cloned into
    pub working_dir: PathBuf,
    /// Directory, at or inside `working_dir`, that holds the published content
    pub content_dir: PathBuf,
    /// Branch to publish to
    pub branch: String,
    /// Commit author; falls back to git configuration
    pub author: Option<AuthorConfig>,
}

impl WorkspaceOptions {
    /// Options publishing to the default branch with content at the workspace root
    pub fn new(uri: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        let working_dir = working_dir.into();
        Self {
            uri: uri.into(),
            content_dir: working_dir.clone(),
            working_dir,
            branch: crate::config::DEFAULT_BRANCH.to_string(),
            author: None,
        }
    }

    /// Publish to `branch`
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    /// Place content in `content_dir`
    pub fn content_dir(mut self, content_dir: impl Into<PathBuf>) -> Self {
        self.content_dir = content_dir.into();
        self
    }

    /// Commit as `author`
    pub fn author(mut self, author: AuthorConfig) -> Self {
        self.author = Some(author);
        self
    }

    /// Build options from loaded configuration
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        let uri = config.require_uri()?;
        let mut options = Self::new(uri, &config.working_dir)
            .branch(&config.branch)
            .content_dir(config.content_target());
        options.author = config.author.clone();
        Ok(options)
    }
}

/// How HEAD was placed on the target branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOrigin {
    /// The remote already had the branch; HEAD is at its tip
    Existing { commit: Oid },
    /// A new orphan branch was created; HEAD is unborn
    Orphan,
}

/// Progress of a publish run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PublishStage {
    Uninitialized,
    Cloned,
    BranchResolved,
    ContentCleared,
    ContentStaged,
    Committed,
    Pushed,
}

/// Result of [`PagesWorkspace::publish`]
///
/// Only `Pushed` means the remote changed. `NothingToAdd` and `Unchanged`
/// are successful runs; whether they should count as failures is left to
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// A commit was created and pushed
    Pushed { commit: Oid },
    /// The workspace held nothing to stage
    NothingToAdd,
    /// The staged tree matched the branch tip
    Unchanged,
}

impl PublishOutcome {
    /// Whether the remote branch was updated
    pub fn is_pushed(&self) -> bool {
        matches!(self, PublishOutcome::Pushed { .. })
    }
}

/// A cloned repository checked out on the publish branch
pub struct PagesWorkspace<S: EventSink> {
    repo: GitRepo,
    working_dir: PathBuf,
    content_dir: PathBuf,
    uri: String,
    branch: String,
    author: Option<AuthorConfig>,
    origin: BranchOrigin,
    stage: PublishStage,
    sink: S,
}

impl<S: EventSink> std::fmt::Debug for PagesWorkspace<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagesWorkspace")
            .field("working_dir", &self.working_dir)
            .field("content_dir", &self.content_dir)
            .field("branch", &self.branch)
            .field("origin", &self.origin)
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}

impl<S: EventSink> PagesWorkspace<S> {
    /// Clone the remote and place HEAD on the publish branch
    ///
    /// The content directory and branch name are validated before anything
    /// touches the filesystem or the network.
    pub fn open(options: WorkspaceOptions, sink: S) -> Result<Self> {
        let working_dir = paths::normalize(&options.working_dir)?;
        let content_dir = paths::normalize(&options.content_dir)?;

        if !content_dir.starts_with(&working_dir) {
            return Err(Error::Config(format!(
                "Content directory {} must be inside the working directory {}",
                content_dir.display(),
                working_dir.display()
            )));
        }
        if content_dir.starts_with(working_dir.join(GIT_DIR)) {
            return Err(Error::Config(format!(
                "Content directory {} is inside the git directory",
                content_dir.display()
            )));
        }
        crate::config::validate_uri(&options.uri)?;
        let branch = branch_name(&options.branch)?.to_string();

        if !working_dir.exists() {
            fs::create_dir_all(&working_dir).map_err(|e| {
                Error::setup(
                    format!("Could not create working directory {}", working_dir.display()),
                    e,
                )
            })?;
        }

        sink.report(&PublishEvent::Cloning {
            uri: options.uri.clone(),
        });
        let repo = clone_without_checkout(&options.uri, &working_dir)?;
        tracing::debug!(stage = ?PublishStage::Cloned, dir = %working_dir.display(), "Cloned");

        let origin = place_head(&repo, &branch, &sink)?;

        Ok(Self {
            repo,
            working_dir,
            content_dir,
            uri: options.uri,
            branch,
            author: options.author,
            origin,
            stage: PublishStage::BranchResolved,
            sink,
        })
    }

    /// Remove all tracked content under the content directory
    ///
    /// Files leave both the index and the working tree, so their deletion is
    /// staged. The content directory is created when missing. Returns the
    /// number of paths removed.
    pub fn reset_content(&mut self) -> Result<usize> {
        self.sink.report(&PublishEvent::ClearingContent {
            dir: self.content_dir.clone(),
        });

        fs::create_dir_all(&self.content_dir).map_err(|e| {
            Error::io(
                format!("Could not create content directory {}", self.content_dir.display()),
                e,
            )
        })?;

        let prefix = paths::repo_relative(&self.working_dir, &self.content_dir)?;
        let mut index = self
            .repo
            .inner()
            .index()
            .map_err(|e| Error::git("reading index", e))?;

        let mut tracked = BTreeSet::new();
        for entry in index.iter() {
            let path = paths::index_path(&entry.path)?;
            if is_under(&prefix, &path) {
                tracked.insert(path);
            }
        }

        for path in &tracked {
            index
                .remove_path(path)
                .map_err(|e| Error::git(format!("removing {} from index", path.display()), e))?;

            let on_disk = self.working_dir.join(path);
            match fs::remove_file(&on_disk) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::io(format!("removing {}", on_disk.display()), e)),
            }
        }

        index
            .write()
            .map_err(|e| Error::git("writing index", e))?;
        remove_empty_dirs(&self.content_dir)?;

        tracing::debug!(removed = tracked.len(), "Cleared content directory");
        self.stage = PublishStage::ContentCleared;
        Ok(tracked.len())
    }

    /// Copy the contents of `source` into the content directory
    ///
    /// Version control state is not touched; staging happens in
    /// [`PagesWorkspace::publish`]. Returns the number of files copied.
    pub fn add_content(&mut self, source: impl AsRef<Path>) -> Result<u64> {
        let source = source.as_ref();
        if !source.exists() {
            return Err(Error::ContentNotFound(source.to_path_buf()));
        }
        if paths::is_within(&self.content_dir, source)? {
            return Err(Error::Config(format!(
                "Content source {} contains the content directory {}",
                source.display(),
                self.content_dir.display()
            )));
        }

        self.sink.report(&PublishEvent::CopyingContent {
            from: source.to_path_buf(),
            to: self.content_dir.clone(),
        });
        paths::copy_dir_all(source, &self.content_dir)
    }

    /// Stage everything in the workspace, commit, and push
    pub fn publish(&mut self, message: &str) -> Result<PublishOutcome> {
        self.sink.report(&PublishEvent::Staging);

        let entries = paths::publishable_entries(&self.working_dir)?;
        if entries.is_empty() {
            self.sink.report(&PublishEvent::NothingToAdd);
            return Ok(PublishOutcome::NothingToAdd);
        }

        let tree_id = self.stage_all()?;
        self.stage = PublishStage::ContentStaged;

        let repo = self.repo.inner();
        let parent = self.repo.head_commit()?;
        if parent.as_ref().map(|p| p.tree_id()) == Some(tree_id) {
            self.sink.report(&PublishEvent::Unchanged);
            return Ok(PublishOutcome::Unchanged);
        }

        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| Error::git("reading staged tree", e))?;
        let signature = self.signature()?;
        let parents: Vec<_> = parent.iter().collect();
        let commit = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|e| Error::git(format!("committing to {}", self.branch), e))?;
        self.sink.report(&PublishEvent::Committed { commit });
        self.stage = PublishStage::Committed;

        self.sink.report(&PublishEvent::Pushing {
            branch: self.branch.clone(),
            uri: self.uri.clone(),
        });
        self.repo.push_branch(&self.branch)?;
        self.stage = PublishStage::Pushed;

        Ok(PublishOutcome::Pushed { commit })
    }

    /// Stage additions, modifications and deletions across the working tree
    ///
    /// Uses the match-all pathspec, so file names are never read as globs.
    fn stage_all(&self) -> Result<Oid> {
        let mut index = self
            .repo
            .inner()
            .index()
            .map_err(|e| Error::git("reading index", e))?;

        index
            .add_all(["*"], IndexAddOption::DEFAULT, None)
            .map_err(|e| Error::git("staging content", e))?;
        index
            .update_all(["*"], None)
            .map_err(|e| Error::git("staging content", e))?;
        index
            .write()
            .map_err(|e| Error::git("writing index", e))?;

        index
            .write_tree()
            .map_err(|e| Error::git("writing tree", e))
    }

    fn signature(&self) -> Result<Signature<'static>> {
        let signature = match &self.author {
            Some(author) => Signature::now(&author.name, &author.email),
            None => self
                .repo
                .inner()
                .signature()
                .or_else(|_| Signature::now("ghp", "ghp@localhost")),
        };
        signature.map_err(|e| Error::git("building commit signature", e))
    }

    /// How the publish branch was resolved
    pub fn origin(&self) -> BranchOrigin {
        self.origin
    }

    /// How far the run has progressed
    pub fn stage(&self) -> PublishStage {
        self.stage
    }

    /// Directory the remote was cloned into
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Directory holding the published content
    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// The underlying repository
    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }
}

/// Check out the remote branch, or create an orphan branch when it is absent
fn place_head(repo: &GitRepo, branch: &str, sink: &impl EventSink) -> Result<BranchOrigin> {
    sink.report(&PublishEvent::CheckingOut {
        branch: branch.to_string(),
    });

    let resolved = repo.checkout_remote_branch(branch)?;
    if let (true, Some(commit)) = (resolved.found_remote, resolved.start) {
        return Ok(BranchOrigin::Existing { commit });
    }

    sink.report(&PublishEvent::BranchNotFound {
        branch: branch.to_string(),
    });
    sink.report(&PublishEvent::CreatingOrphan {
        branch: branch.to_string(),
    });
    OrphanBranch::new(branch).create(repo)?;

    Ok(BranchOrigin::Orphan)
}

/// Whether repository path `path` lies under directory `prefix` (empty is the root)
fn is_under(prefix: &Path, path: &Path) -> bool {
    prefix.as_os_str().is_empty() || (path != prefix && path.starts_with(prefix))
}

/// Remove directories under `dir` left empty, keeping `dir` itself and `.git`
fn remove_empty_dirs(dir: &Path) -> Result<()> {
    let read = fs::read_dir(dir).map_err(|e| Error::io(format!("reading {}", dir.display()), e))?;
    for entry in read {
        let entry = entry.map_err(|e| Error::io(format!("reading {}", dir.display()), e))?;
        let path = entry.path();
        if entry.file_name().as_os_str() == GIT_DIR || !path.is_dir() {
            continue;
        }

        remove_empty_dirs(&path)?;
        let is_empty = fs::read_dir(&path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(&path)
                .map_err(|e| Error::io(format!("removing {}", path.display()), e))?;
        }
    }
    Ok(())
}

/// Run a complete publish: open, reset, add `source`, commit and push
pub fn publish_directory<S: EventSink>(
    options: WorkspaceOptions,
    source: &Path,
    message: &str,
    sink: S,
) -> Result<PublishOutcome> {
    let mut workspace = PagesWorkspace::open(options, sink)?;
    workspace.reset_content()?;
    workspace.add_content(source)?;
    workspace.publish(message)
}
