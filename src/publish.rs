// src/publish.rs
//! Commit (and optionally push) refreshed data and charts with git.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::process::Command;

use crate::config::AppConfig;

pub struct GitPublisher {
    repo_dir: PathBuf,
    git_bin: String,
    push: bool,
}

impl GitPublisher {
    pub fn new(repo_dir: impl Into<PathBuf>, git_bin: impl Into<String>, push: bool) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            git_bin: git_bin.into(),
            push,
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Self {
        Self::new(&cfg.root_dir, &cfg.publish.git_bin, cfg.publish.push)
    }

    async fn git(&self, args: &[&str]) -> Result<()> {
        let status = Command::new(&self.git_bin)
            .args(args)
            .current_dir(&self.repo_dir)
            .status()
            .await
            .with_context(|| format!("spawning `{} {}`", self.git_bin, args.join(" ")))?;
        if !status.success() {
            bail!("`{} {}` exited with {status}", self.git_bin, args.join(" "));
        }
        Ok(())
    }

    /// `git add .`, `git commit -m "Auto commit <ctime>"`, then `git push` when enabled.
    pub async fn publish(&self) -> Result<()> {
        let message = format!("Auto commit {}", chrono::Local::now().format("%a %b %e %H:%M:%S %Y"));
        self.git(&["add", "."]).await?;
        self.git(&["commit", "-m", &message]).await?;
        if self.push {
            self.git(&["push"]).await?;
        }
        tracing::info!(target: "report", repo = %self.repo_dir.display(), pushed = self.push, "git workflow completed");
        Ok(())
    }
}
