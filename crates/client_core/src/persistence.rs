use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::scene::Snapshot;
use tokio::sync::RwLock;

/// Project storage keyed by name. Implementations own the storage format.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<String>>;
    async fn save_project(&self, name: &str, snapshot: &Snapshot) -> Result<()>;
    async fn load_project(&self, name: &str) -> Result<Snapshot>;
    async fn delete_project(&self, name: &str) -> Result<()>;
}

pub fn validate_project_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("project name must not be empty"));
    }
    if trimmed.contains(['/', '\\']) {
        return Err(anyhow!("project name '{trimmed}' must not contain path separators"));
    }
    Ok(trimmed)
}

#[derive(Default)]
pub struct MemoryProjectStore {
    projects: RwLock<BTreeMap<String, Snapshot>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn list_projects(&self) -> Result<Vec<String>> {
        Ok(self.projects.read().await.keys().cloned().collect())
    }

    async fn save_project(&self, name: &str, snapshot: &Snapshot) -> Result<()> {
        let name = validate_project_name(name)?;
        self.projects
            .write()
            .await
            .insert(name.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load_project(&self, name: &str) -> Result<Snapshot> {
        let name = validate_project_name(name)?;
        self.projects
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("project '{name}' not found"))
    }

    async fn delete_project(&self, name: &str) -> Result<()> {
        let name = validate_project_name(name)?;
        self.projects
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| anyhow!("project '{name}' not found"))
    }
}
