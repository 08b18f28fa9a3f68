//! Test fixtures and environment helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Returns `true` if a Docker daemon is reachable for integration tests.
#[must_use]
pub fn docker_available() -> bool {
    docker_available_with_host(std::env::var("DOCKER_HOST").ok())
}

fn docker_available_with_host(host: Option<String>) -> bool {
    if let Some(host) = host {
        if let Some(path) = host.strip_prefix("unix://") {
            return Path::new(path).exists();
        }
        return true;
    }

    Path::new("/var/run/docker.sock").exists()
        || Command::new("docker")
            .args(["info"])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
}

/// Create an empty temporary destination root.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn dest_root() -> Result<TempDir> {
    TempDir::new().context("failed to create temporary destination root")
}

/// Write a small file at `relative` under `root`, creating parent directories.
///
/// Leading separators are stripped the same way the remover strips them.
///
/// # Errors
///
/// Returns an error if the directories or file cannot be written.
pub fn write_file(root: &Path, relative: &str) -> Result<PathBuf> {
    let path = root.join(relative.trim_start_matches(['/', '\\']));
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, b"payload").with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}
