//! Publish command - Push a content directory to the publish branch

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use ghp_core::config::parse_duration;
use ghp_core::{
    publish_directory, Config, PublishOutcome, PublishOverrides, TracingSink, WorkspaceOptions,
};

/// Exit code used when the run exceeds `--timeout`, as timeout(1) does
const EXIT_TIMEOUT: i32 = 124;

/// Arguments for the publish command
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Repository to publish to (overrides config and env)
    #[arg(long)]
    pub uri: Option<String>,

    /// Branch to publish to [default: gh-pages]
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Directory whose contents are published [default: target/apidocs]
    #[arg(short = 'd', long)]
    pub content_dir: Option<PathBuf>,

    /// Subdirectory of the published branch to place the content in
    #[arg(long)]
    pub content_destination: Option<PathBuf>,

    /// Where to clone the repository [default: target/ghp-plugin]
    #[arg(short, long)]
    pub working_dir: Option<PathBuf>,

    /// Commit message
    #[arg(short, long)]
    pub message: Option<String>,

    /// Abort the run after this long (e.g. "90s", "5m")
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Exit with an error when there was nothing to publish
    #[arg(long)]
    pub fail_on_empty: bool,
}

impl PublishArgs {
    /// Configuration overrides carried by the flags
    pub fn overrides(&self) -> PublishOverrides {
        PublishOverrides {
            uri: self.uri.clone(),
            branch: self.branch.clone(),
            content_dir: self.content_dir.clone(),
            content_destination: self.content_destination.clone(),
            working_dir: self.working_dir.clone(),
            commit_message: self.message.clone(),
            timeout: self.timeout,
        }
    }

    /// Execute the publish command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let publish = &config.publish;
        let options = WorkspaceOptions::from_config(publish)?;
        let branch = options.branch.clone();
        let uri = options.uri.clone();
        let source = publish.content_dir.clone();
        let message = publish.commit_message();
        tracing::debug!(message = %message, "Using commit message");

        let task = tokio::task::spawn_blocking(move || {
            publish_directory(options, &source, &message, TracingSink)
        });

        let outcome = match publish.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined??,
                Err(_) => {
                    tracing::error!(?limit, "Publish did not finish in time");
                    // Blocking git work cannot be cancelled; exit without waiting for it
                    std::process::exit(EXIT_TIMEOUT);
                }
            },
            None => task.await??,
        };

        match outcome {
            PublishOutcome::Pushed { commit } => {
                println!("Published {} to {} at {}", commit, branch, uri);
            }
            PublishOutcome::NothingToAdd | PublishOutcome::Unchanged => {
                let reason = if outcome == PublishOutcome::NothingToAdd {
                    "nothing to add"
                } else {
                    "content unchanged"
                };
                if self.fail_on_empty {
                    anyhow::bail!("Nothing published to {}: {}", branch, reason);
                }
                println!("Nothing published to {}: {}", branch, reason);
            }
        }

        Ok(())
    }
}
