//! Path helpers: containment checks, directory enumeration, recursive copy

use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use crate::{Error, Result};

/// Name of the git metadata directory, never enumerated or copied
pub const GIT_DIR: &str = ".git";

/// Make a path absolute and lexically resolve `.` and `..` components
///
/// The path does not need to exist.
pub fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)
        .map_err(|e| Error::io(format!("resolving {}", path.display()), e))?;

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Check that `dir` is `parent` itself or lies inside it
///
/// Compares whole path components, so `/tmp/ab` is not inside `/tmp/a`.
pub fn is_within(dir: &Path, parent: &Path) -> Result<bool> {
    Ok(normalize(dir)?.starts_with(normalize(parent)?))
}

/// Whether a directory tree contains at least one non-directory entry
pub fn has_files(dir: &Path) -> Result<bool> {
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = entry.map_err(|e| walk_error(dir, e))?;
        if !entry.file_type().is_dir() {
            return Ok(true);
        }
    }
    Ok(false)
}

/// List the immediate entries of `dir` that git could track
///
/// Skips `.git` and directories that contain no files. Names are sorted.
pub fn publishable_entries(dir: &Path) -> Result<Vec<OsString>> {
    let read = fs::read_dir(dir)
        .map_err(|e| Error::io(format!("walking directory tree {}", dir.display()), e))?;

    let mut names = Vec::new();
    for entry in read {
        let entry =
            entry.map_err(|e| Error::io(format!("walking directory tree {}", dir.display()), e))?;
        let name = entry.file_name();
        if name.as_os_str() == GIT_DIR {
            continue;
        }

        let file_type = entry
            .file_type()
            .map_err(|e| Error::io(format!("reading {}", entry.path().display()), e))?;
        if file_type.is_dir() && !has_files(&entry.path())? {
            continue;
        }

        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Path of `path` relative to `root`
///
/// Returns an empty path when `path` is `root`.
pub fn repo_relative(root: &Path, path: &Path) -> Result<PathBuf> {
    let root = normalize(root)?;
    let path = normalize(path)?;
    let relative = path.strip_prefix(&root).map_err(|_| {
        Error::Config(format!(
            "{} is not inside {}",
            path.display(),
            root.display()
        ))
    })?;
    Ok(relative.to_path_buf())
}

/// Path of an index entry, relative to the repository root
///
/// Index paths are raw bytes with `/` separators.
#[cfg(unix)]
pub fn index_path(bytes: &[u8]) -> Result<PathBuf> {
    use std::os::unix::ffi::OsStrExt;
    Ok(PathBuf::from(OsStr::from_bytes(bytes)))
}

/// Path of an index entry, relative to the repository root
///
/// Index paths are raw bytes with `/` separators.
#[cfg(not(unix))]
pub fn index_path(bytes: &[u8]) -> Result<PathBuf> {
    std::str::from_utf8(bytes).map(PathBuf::from).map_err(|_| {
        Error::Config(format!(
            "Index path is not valid UTF-8: {}",
            String::from_utf8_lossy(bytes)
        ))
    })
}

/// Recursively copy the contents of `from` into `to`
///
/// Existing files in `to` are overwritten. `.git` directories in the source
/// are skipped. Returns the number of files copied.
pub fn copy_dir_all(from: &Path, to: &Path) -> Result<u64> {
    fs::create_dir_all(to).map_err(|e| Error::io(format!("creating {}", to.display()), e))?;

    let mut copied = 0;
    let walker = WalkDir::new(from)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| e.file_name() != GIT_DIR);

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(from, e))?;
        let relative = entry.path().strip_prefix(from).map_err(|_| {
            Error::Config(format!(
                "{} escaped {}",
                entry.path().display(),
                from.display()
            ))
        })?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| Error::io(format!("creating {}", target.display()), e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| {
                Error::io(
                    format!("copying {} to {}", entry.path().display(), target.display()),
                    e,
                )
            })?;
            copied += 1;
        }
    }

    Ok(copied)
}

fn walk_error(dir: &Path, err: walkdir::Error) -> Error {
    Error::io(format!("walking directory tree {}", dir.display()), err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/tmp/a/docs"), Path::new("/tmp/a")).unwrap());
        assert!(is_within(Path::new("/tmp/a"), Path::new("/tmp/a")).unwrap());
        assert!(!is_within(Path::new("/tmp/b"), Path::new("/tmp/a")).unwrap());
        assert!(!is_within(Path::new("/tmp/ab"), Path::new("/tmp/a")).unwrap());
        assert!(!is_within(Path::new("/tmp/a/../b"), Path::new("/tmp/a")).unwrap());
    }

    #[test]
    fn test_normalize_relative() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(normalize(Path::new("x/./y/../z")).unwrap(), cwd.join("x/z"));
    }

    #[test]
    fn test_repo_relative() {
        let root = Path::new("/work/site");
        assert_eq!(
            repo_relative(root, Path::new("/work/site/docs/api")).unwrap(),
            Path::new("docs/api")
        );
        assert_eq!(repo_relative(root, root).unwrap(), PathBuf::new());
        assert!(repo_relative(root, Path::new("/work/other")).is_err());
    }

    #[test]
    fn test_publishable_entries_skips_git_and_empty_dirs() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/index.html"), "hi").unwrap();
        fs::write(dir.path().join("README.md"), "readme").unwrap();

        let entries = publishable_entries(dir.path()).unwrap();
        assert_eq!(entries, vec![OsString::from("README.md"), OsString::from("docs")]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_are_kept() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let name = OsStr::from_bytes(b"caf\xe9.html");
        fs::write(dir.path().join(name), "bytes").unwrap();

        assert_eq!(publishable_entries(dir.path()).unwrap(), vec![name.to_os_string()]);
        assert_eq!(index_path(b"docs/caf\xe9.html").unwrap(), Path::new("docs").join(name));
    }

    #[test]
    fn test_publishable_entries_missing_dir() {
        let dir = TempDir::new().unwrap();
        let result = publishable_entries(&dir.path().join("missing"));
        assert!(matches!(result, Err(Error::Io { .. })));
    }

    #[test]
    fn test_copy_dir_all() {
        let src = TempDir::new().unwrap();
        let dst = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("css")).unwrap();
        fs::write(src.path().join("index.html"), "v1").unwrap();
        fs::write(src.path().join("css/site.css"), "body {}").unwrap();
        fs::create_dir_all(src.path().join(".git")).unwrap();
        fs::write(src.path().join(".git/config"), "").unwrap();
        fs::write(dst.path().join("index.html"), "old").unwrap();

        let copied = copy_dir_all(src.path(), dst.path()).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dst.path().join("index.html")).unwrap(), "v1");
        assert_eq!(
            fs::read_to_string(dst.path().join("css/site.css")).unwrap(),
            "body {}"
        );
        assert!(!dst.path().join(".git").exists());
    }
}
