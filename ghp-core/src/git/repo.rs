//! Repository handle and common lookups

use std::path::{Path, PathBuf};

use git2::{Commit, ErrorCode, Reference, Repository};

use crate::{Error, Result};

/// A git repository bound to exactly one working directory
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the working directory root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the repository whose working directory is `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::open(path).map_err(|e| {
            if e.code() == ErrorCode::NotFound {
                Error::Config(format!("Not a git repository: {}", path.display()))
            } else {
                Error::git(format!("opening {}", path.display()), e)
            }
        })?;

        Self::from_repository(repo)
    }

    /// Wrap an already opened repository
    pub fn from_repository(repo: Repository) -> Result<Self> {
        let root = repo
            .workdir()
            .ok_or_else(|| Error::Config("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the working directory root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up a reference by full name, `None` when it does not exist
    pub fn find_ref(&self, name: &str) -> Result<Option<Reference<'_>>> {
        match self.repo.find_reference(name) {
            Ok(reference) => Ok(Some(reference)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(Error::git(format!("looking up {}", name), e)),
        }
    }

    /// Full ref name HEAD points at, even when that branch is unborn
    ///
    /// Returns `None` for a detached HEAD.
    pub fn head_target(&self) -> Result<Option<String>> {
        let head = self
            .repo
            .find_reference("HEAD")
            .map_err(|e| Error::git("reading HEAD", e))?;
        Ok(head.symbolic_target().map(str::to_string))
    }

    /// Commit HEAD resolves to, `None` while the current branch is unborn
    pub fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        let head = match self.repo.head() {
            Ok(head) => head,
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                return Ok(None)
            }
            Err(e) => return Err(Error::git("resolving HEAD", e)),
        };

        head.peel_to_commit()
            .map(Some)
            .map_err(|e| Error::git("resolving HEAD commit", e))
    }

    /// Get access to the underlying git2 repository
    pub fn inner(&self) -> &Repository {
        &self.repo
    }
}
