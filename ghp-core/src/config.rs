//! Configuration management for ghp
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (GHP_*)
//! 3. Config file (./ghp.toml, else ~/.config/ghp/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Branch published to when none is configured
pub const DEFAULT_BRANCH: &str = "gh-pages";

/// Directory content is copied from when none is configured
pub const DEFAULT_CONTENT_DIR: &str = "target/apidocs";

/// Directory the remote is cloned into when none is configured
pub const DEFAULT_WORKING_DIR: &str = "target/ghp-plugin";

/// Project-local config file, checked before the user config
pub const LOCAL_CONFIG_FILE: &str = "ghp.toml";

/// Commit author
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthorConfig {
    pub name: String,
    pub email: String,
}

/// Publish settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Repository to clone and push to
    pub uri: Option<String>,

    /// Branch to publish to
    pub branch: String,

    /// Local directory whose contents are published
    pub content_dir: PathBuf,

    /// Subdirectory of the working directory the content goes to
    pub content_destination: Option<PathBuf>,

    /// Where the remote is cloned
    pub working_dir: PathBuf,

    /// Commit message; a generated one is used when unset or empty
    pub commit_message: Option<String>,

    /// Upper bound on a whole publish run
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// Commit author; falls back to git configuration
    pub author: Option<AuthorConfig>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            uri: None,
            branch: DEFAULT_BRANCH.to_string(),
            content_dir: PathBuf::from(DEFAULT_CONTENT_DIR),
            content_destination: None,
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            commit_message: None,
            timeout: None,
            author: None,
        }
    }
}

impl PublishConfig {
    /// Repository URI, validated
    pub fn require_uri(&self) -> Result<&str> {
        let uri = self.uri.as_deref().ok_or_else(|| {
            Error::Config("No repository URI configured. Pass --uri or set GHP_URI".to_string())
        })?;
        validate_uri(uri)?;
        Ok(uri)
    }

    /// Directory inside the working directory that receives the content
    pub fn content_target(&self) -> PathBuf {
        match &self.content_destination {
            Some(dest) => self.working_dir.join(dest),
            None => self.working_dir.clone(),
        }
    }

    /// Configured commit message, or the generated default
    pub fn commit_message(&self) -> String {
        match self.commit_message.as_deref() {
            Some(msg) if !msg.trim().is_empty() => msg.to_string(),
            _ => default_commit_message(),
        }
    }
}

/// Commit message used when none is configured
pub fn default_commit_message() -> String {
    format!(
        "Automatic commit message generated by ghp\nghp {}",
        env!("CARGO_PKG_VERSION")
    )
}

/// Parse a human-readable duration such as `90s` or `5m`
pub fn parse_duration(value: &str) -> std::result::Result<Duration, String> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| e.to_string())
}

/// Check that a repository URI is usable
///
/// URIs with a scheme must parse as URLs; scp-like `user@host:path` forms
/// and local paths are passed through to git as is.
pub fn validate_uri(uri: &str) -> Result<()> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(Error::Config("Repository URI is empty".to_string()));
    }

    if uri.contains("://") {
        url::Url::parse(uri)
            .map_err(|e| Error::Config(format!("Invalid repository URI {}: {}", uri, e)))?;
    }

    Ok(())
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct PublishOverrides {
    pub uri: Option<String>,
    pub branch: Option<String>,
    pub content_dir: Option<PathBuf>,
    pub content_destination: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub commit_message: Option<String>,
    pub timeout: Option<Duration>,
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Publish configuration
    pub publish: PublishConfig,
}

impl Config {
    /// Load configuration from the first config file found
    ///
    /// Returns default config if no file exists
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading {}", path.display()), e))?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// The config file [`Config::load`] would read, if any exists
    pub fn config_path() -> Option<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Some(local);
        }
        Self::default_config_path().filter(|p| p.exists())
    }

    /// Get the default user config file path
    ///
    /// Returns `~/.config/ghp/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ghp").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - GHP_URI: Repository to publish to
    /// - GHP_BRANCH: Branch to publish to
    /// - GHP_CONTENT_DIR: Directory to publish
    /// - GHP_CONTENT_DEST: Destination inside the working directory
    /// - GHP_WORKING_DIR: Clone location
    /// - GHP_COMMIT_MESSAGE: Commit message
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let publish = &mut self.publish;

        if let Some(uri) = lookup("GHP_URI") {
            publish.uri = Some(uri);
        }
        if let Some(branch) = lookup("GHP_BRANCH") {
            publish.branch = branch;
        }
        if let Some(dir) = lookup("GHP_CONTENT_DIR") {
            publish.content_dir = PathBuf::from(dir);
        }
        if let Some(dest) = lookup("GHP_CONTENT_DEST") {
            publish.content_destination = Some(PathBuf::from(dest));
        }
        if let Some(dir) = lookup("GHP_WORKING_DIR") {
            publish.working_dir = PathBuf::from(dir);
        }
        if let Some(msg) = lookup("GHP_COMMIT_MESSAGE") {
            publish.commit_message = Some(msg);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: PublishOverrides) -> Self {
        let publish = &mut self.publish;

        if let Some(uri) = overrides.uri {
            publish.uri = Some(uri);
        }
        if let Some(branch) = overrides.branch {
            publish.branch = branch;
        }
        if let Some(dir) = overrides.content_dir {
            publish.content_dir = dir;
        }
        if let Some(dest) = overrides.content_destination {
            publish.content_destination = Some(dest);
        }
        if let Some(dir) = overrides.working_dir {
            publish.working_dir = dir;
        }
        if let Some(msg) = overrides.commit_message {
            publish.commit_message = Some(msg);
        }
        if let Some(timeout) = overrides.timeout {
            publish.timeout = Some(timeout);
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(overrides: PublishOverrides) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(overrides))
    }
}
