//! Repository fixtures for tests

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use git2::{
    Index, IndexEntry, IndexTime, ObjectType, Oid, Repository, RepositoryInitOptions, Signature,
    Tree, TreeWalkMode, TreeWalkResult,
};

use super::GitRepo;

pub fn signature() -> Signature<'static> {
    Signature::now("Test", "test@example.com").unwrap()
}

/// Create a non-bare repository with one commit holding `files`
pub fn init_with_files(dir: &Path, files: &[(&str, &str)]) -> GitRepo {
    let repo = Repository::init(dir).unwrap();
    commit_worktree(&repo, files, "initial");
    GitRepo::from_repository(repo).unwrap()
}

/// Write `files` to the working tree, stage them and commit on HEAD
pub fn commit_worktree(repo: &Repository, files: &[(&str, &str)], message: &str) -> Oid {
    let root = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (name, contents) in files {
        let path = root.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        index.add_path(Path::new(name)).unwrap();
    }
    index.write().unwrap();

    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    let sig = signature();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Create a bare remote whose `main` branch holds a README
pub fn bare_remote(dir: &Path) -> PathBuf {
    let path = dir.join("remote.git");
    let mut opts = RepositoryInitOptions::new();
    opts.bare(true).initial_head("main");
    let repo = Repository::init_opts(&path, &opts).unwrap();
    commit_files(&repo, "refs/heads/main", &[("README.md", "project")], "initial");
    path
}

/// Commit `files` as the complete tree of `refname`, on top of its tip if any
pub fn commit_files(
    repo: &Repository,
    refname: &str,
    files: &[(&str, &str)],
    message: &str,
) -> Oid {
    let mut index = Index::new().unwrap();
    for (name, contents) in files {
        let entry = IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: 0o100644,
            uid: 0,
            gid: 0,
            file_size: contents.len() as u32,
            id: repo.blob(contents.as_bytes()).unwrap(),
            flags: 0,
            flags_extended: 0,
            path: name.as_bytes().to_vec(),
        };
        index.add(&entry).unwrap();
    }

    let tree = repo.find_tree(index.write_tree_to(repo).unwrap()).unwrap();
    let parent = repo
        .find_reference(refname)
        .ok()
        .and_then(|r| r.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    let sig = signature();
    repo.commit(Some(refname), &sig, &sig, message, &tree, &parents)
        .unwrap()
}

/// Every blob in `tree` keyed by its full path, lossily decoded
pub fn tree_files(repo: &Repository, tree: &Tree<'_>) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    tree.walk(TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(ObjectType::Blob) {
            let blob = repo.find_blob(entry.id()).unwrap();
            files.insert(
                format!("{}{}", root, String::from_utf8_lossy(entry.name_bytes())),
                String::from_utf8_lossy(blob.content()).into_owned(),
            );
        }
        TreeWalkResult::Ok
    })
    .unwrap();
    files
}

/// Files on disk under `dir`, skipping `.git`
pub fn worktree_files(dir: &Path) -> BTreeMap<String, String> {
    let mut files = BTreeMap::new();
    for entry in walkdir::WalkDir::new(dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git")
    {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            let relative = entry.path().strip_prefix(dir).unwrap();
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(key, fs::read_to_string(entry.path()).unwrap());
        }
    }
    files
}

/// Owned map literal helper
pub fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
