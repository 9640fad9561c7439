use std::{io::ErrorKind, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use client_core::{validate_project_name, ProjectStore};
use shared::scene::Snapshot;
use tokio::fs;

/// One `<name>.json` snapshot per project under `dir`.
pub struct FileProjectStore {
    dir: PathBuf,
}

impl FileProjectStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn project_path(&self, name: &str) -> Result<PathBuf> {
        let name = validate_project_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }
}

#[async_trait]
impl ProjectStore for FileProjectStore {
    async fn list_projects(&self) -> Result<Vec<String>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to read project directory '{}'", self.dir.display())
                })
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn save_project(&self, name: &str, snapshot: &Snapshot) -> Result<()> {
        let path = self.project_path(name)?;
        fs::create_dir_all(&self.dir).await.with_context(|| {
            format!("failed to create project directory '{}'", self.dir.display())
        })?;
        fs::write(&path, serde_json::to_vec_pretty(snapshot)?)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))
    }

    async fn load_project(&self, name: &str) -> Result<Snapshot> {
        let path = self.project_path(name)?;
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(anyhow!("project '{}' not found", name.trim()))
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read '{}'", path.display()))
            }
        };
        serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not a snapshot", path.display()))
    }

    async fn delete_project(&self, name: &str) -> Result<()> {
        let path = self.project_path(name)?;
        fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete '{}'", path.display()))
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
