use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// File access the pipeline needs from the host project. Paths are project-relative.
pub trait ProjectFs {
    fn exists(&self, path: &str) -> bool;
    fn read(&self, path: &str) -> Result<String>;
    fn write(&mut self, path: &str, contents: &str) -> Result<()>;
    fn remove(&mut self, path: &str) -> Result<()>;
    /// Tells the host to re-index after files changed.
    fn refresh(&mut self);
}

/// Project rooted at a directory on disk.
pub struct DiskProject {
    root: PathBuf,
    revision: u64,
}

impl DiskProject {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), revision: 0 }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Bumped by every `refresh`.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim());
        if relative.as_os_str().is_empty() {
            bail!("Empty file path");
        }
        let escapes = relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes {
            bail!("Path '{path}' points outside the project");
        }
        Ok(self.root.join(relative))
    }
}

impl ProjectFs for DiskProject {
    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|full| full.is_file()).unwrap_or(false)
    }

    fn read(&self, path: &str) -> Result<String> {
        let full = self.resolve(path)?;
        fs::read_to_string(&full).with_context(|| format!("Failed to read {}", full.display()))
    }

    fn write(&mut self, path: &str, contents: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| format!("Creating directory {}", parent.display()))?;
            }
        }
        fs::write(&full, contents).with_context(|| format!("Failed to write {}", full.display()))
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        fs::remove_file(&full).with_context(|| format!("Failed to delete {}", full.display()))
    }

    fn refresh(&mut self) {
        self.revision = self.revision.wrapping_add(1);
        debug!(target: "copilot::project", revision = self.revision, "project refreshed");
    }
}
