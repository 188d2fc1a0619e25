use crate::domain::model::Artifact;
use crate::domain::ports::Storage;
use crate::utils::error::{CleanError, Result};
use crate::utils::validation::validate_path;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Joins a relative name under the base path, refusing escapes.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        validate_path("path", path)?;
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(CleanError::InvalidConfigValueError {
                field: "path".to_string(),
                value: path.to_string(),
                reason: "Path must stay inside the storage directory".to_string(),
            });
        }
        Ok(self.base_path.join(relative))
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        Ok(tokio::fs::read(full_path).await?)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn remove_file(&self, path: &str) -> Result<()> {
        let full_path = self.resolve(path)?;
        match tokio::fs::remove_file(full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Token → artifact index shared by the request handlers.
#[derive(Debug, Clone, Default)]
pub struct ArtifactRegistry {
    entries: Arc<RwLock<HashMap<String, Artifact>>>,
    ttl: Option<Duration>,
}

impl ArtifactRegistry {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            entries: Arc::default(),
            ttl,
        }
    }

    fn is_expired(&self, artifact: &Artifact) -> bool {
        self.ttl
            .is_some_and(|ttl| Utc::now() - artifact.created_at > ttl)
    }

    pub async fn insert(&self, token: String, artifact: Artifact) {
        self.entries.write().await.insert(token, artifact);
    }

    /// Returns the artifact unless it is unknown or past its TTL.
    pub async fn get(&self, token: &str) -> Option<Artifact> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|a| !self.is_expired(a))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Drops expired entries and returns them so their files can be removed.
    pub async fn take_expired(&self) -> Vec<Artifact> {
        if self.ttl.is_none() {
            return Vec::new();
        }
        let mut entries = self.entries.write().await;
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, a)| self.is_expired(a))
            .map(|(token, _)| token.clone())
            .collect();
        expired
            .iter()
            .filter_map(|token| entries.remove(token))
            .collect()
    }
}
