//! Access to previously collected cluster state
//!
//! Analyzers never talk to a live cluster. They read opaque payloads out of
//! a collected bundle by logical key, e.g. `cluster-resources/nodes.json`.

use crate::error::{AnalyzeError, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

/// Key of the collected node list
pub const NODES_KEY: &str = "cluster-resources/nodes.json";

/// Key of the collected deployment list for a namespace
pub fn deployments_key(namespace: &str) -> String {
    format!("cluster-resources/deployments/{}.json", namespace)
}

/// Read-only source of collected payloads
pub trait BlobStore: Send + Sync {
    /// Fetch the payload stored under `key`
    ///
    /// A missing key is an error, never an empty payload.
    fn fetch(&self, key: &str) -> Result<Vec<u8>>;
}

/// Store backed by an extracted support bundle on disk
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes || key.is_empty() {
            return Err(AnalyzeError::Fetch {
                key: key.to_string(),
                reason: "key must be a relative path inside the bundle".to_string(),
            });
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for DirectoryStore {
    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AnalyzeError::not_collected(key),
            _ => AnalyzeError::Fetch {
                key: key.to_string(),
                reason: format!("{}: {}", path.display(), e),
            },
        })
    }
}

/// In-memory store, optionally shadowed by a set of protected payloads
///
/// Protected payloads take precedence over collected ones with the same key.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collected: HashMap<String, Vec<u8>>,
    protected: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        self.insert(key, payload);
        self
    }

    pub fn with_protected(mut self, key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        self.protected.insert(key.into(), payload.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.collected.insert(key.into(), payload.into());
    }

    pub fn len(&self) -> usize {
        self.collected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collected.is_empty()
    }
}

impl BlobStore for MemoryStore {
    fn fetch(&self, key: &str) -> Result<Vec<u8>> {
        self.protected
            .get(key)
            .or_else(|| self.collected.get(key))
            .cloned()
            .ok_or_else(|| AnalyzeError::not_collected(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_deployments_key() {
        assert_eq!(
            deployments_key("kube-system"),
            "cluster-resources/deployments/kube-system.json"
        );
    }

    #[test]
    fn test_memory_store_protected_shadows_collected() {
        let store = MemoryStore::new()
            .with_file(NODES_KEY, "collected")
            .with_file("other.json", "other")
            .with_protected(NODES_KEY, "protected");

        assert_eq!(store.fetch(NODES_KEY).unwrap(), b"protected");
        assert_eq!(store.fetch("other.json").unwrap(), b"other");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_memory_store_missing_key() {
        let store = MemoryStore::new();
        let err = store.fetch(NODES_KEY).unwrap_err();
        assert!(matches!(err, AnalyzeError::Fetch { ref key, .. } if key == NODES_KEY));
        assert!(err.to_string().contains("was not collected"));
    }

    #[test]
    fn test_directory_store_reads_files() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("cluster-resources");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("nodes.json"), "[]").unwrap();

        let store = DirectoryStore::new(temp_dir.path());
        assert_eq!(store.fetch(NODES_KEY).unwrap(), b"[]");

        let err = store.fetch(&deployments_key("default")).unwrap_err();
        assert!(err.to_string().contains("was not collected"));
    }

    #[test]
    fn test_directory_store_rejects_escaping_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = DirectoryStore::new(temp_dir.path());

        for key in ["../secrets.json", "/etc/passwd", "a/../../b", ""] {
            let err = store.fetch(key).unwrap_err();
            assert!(
                err.to_string().contains("relative path"),
                "expected rejection for {key:?}, got {err}"
            );
        }
    }
}
