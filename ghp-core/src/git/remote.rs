//! Clone and push
//!
//! Authentication and transport are left to libgit2: credentials come from
//! the SSH agent, configured credential helpers, or default credentials.

use std::cell::RefCell;
use std::path::Path;

use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks, Repository};

use super::refs::{branch_name, local_ref, DEFAULT_REMOTE};
use super::repo::GitRepo;
use crate::{Error, Result};

/// Credential attempts before giving up
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Build remote callbacks that resolve credentials the way the git CLI would
fn remote_callbacks<'a>(config: Option<git2::Config>) -> RemoteCallbacks<'a> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }

        if allowed.is_ssh_key() {
            if let Some(user) = username_from_url {
                return Cred::ssh_key_from_agent(user);
            }
        }
        if allowed.is_user_pass_plaintext() {
            if let Some(ref cfg) = config {
                if let Ok(cred) = Cred::credential_helper(cfg, url, username_from_url) {
                    return Ok(cred);
                }
            }
        }
        Cred::default()
    });
    callbacks
}

/// Clone `uri` into `dir` without checking out any files
///
/// The repository is initialised empty, `origin` is added with the default
/// fetch refspec, and every branch is fetched into `refs/remotes/origin/`.
/// HEAD stays unborn and the index empty until the caller checks out a
/// branch or creates an orphan one.
pub fn clone_without_checkout(uri: &str, dir: &Path) -> Result<GitRepo> {
    let repo = Repository::init(dir)
        .map_err(|e| Error::setup(format!("Could not initialise {}", dir.display()), e))?;

    {
        let mut remote = repo
            .remote(DEFAULT_REMOTE, uri)
            .map_err(|e| Error::setup(format!("Could not add remote {}", uri), e))?;

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(remote_callbacks(repo.config().ok()));

        remote
            .fetch(&[] as &[&str], Some(&mut fetch_options), None)
            .map_err(|e| Error::setup(format!("Could not clone git repository {}", uri), e))?;
    }

    GitRepo::from_repository(repo)
}

impl GitRepo {
    /// Push `refs/heads/<branch>` to the same name on [`DEFAULT_REMOTE`]
    ///
    /// A reference the remote refuses is reported as
    /// [`Error::PushRejected`], even when the transport itself succeeded.
    pub fn push_branch(&self, branch: &str) -> Result<()> {
        let reference = local_ref(branch_name(branch)?);
        let refspec = format!("{}:{}", reference, reference);

        let mut remote = self
            .inner()
            .find_remote(DEFAULT_REMOTE)
            .map_err(|e| Error::git(format!("finding remote {}", DEFAULT_REMOTE), e))?;

        let rejection: RefCell<Option<String>> = RefCell::new(None);
        let pushed = {
            let mut callbacks = remote_callbacks(self.inner().config().ok());
            callbacks.push_update_reference(|_ref_name, status| {
                if let Some(msg) = status {
                    *rejection.borrow_mut() = Some(msg.to_string());
                }
                Ok(())
            });

            let mut push_options = PushOptions::new();
            push_options.remote_callbacks(callbacks);

            remote.push(&[refspec.as_str()], Some(&mut push_options))
        };

        if let Some(message) = rejection.into_inner() {
            return Err(Error::PushRejected { reference, message });
        }
        pushed.map_err(|e| Error::git(format!("push {}", refspec), e))?;

        tracing::debug!(refspec = %refspec, "Push complete");
        Ok(())
    }
}
