//! Flat-file peer registry
//!
//! Known node base URLs live in a JSON array on disk. The file is re-read on
//! every operation so external edits (or another process on the same host)
//! are picked up without a restart. A missing or unparseable file reads as an
//! empty registry.

use crate::error::ChainError;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct NodeRegistry {
    path: PathBuf,
}

impl NodeRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        NodeRegistry { path: path.into() }
    }

    /// All registered node URLs, in file order.
    pub fn list(&self) -> Vec<String> {
        let Ok(raw) = fs::read_to_string(&self.path) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_default()
    }

    /// All registered node URLs except `own_url`. This is the peer set used
    /// for chain and mempool polling.
    pub fn list_without(&self, own_url: &str) -> Vec<String> {
        self.list().into_iter().filter(|u| u != own_url).collect()
    }

    /// Registers a node URL. Duplicates are ignored.
    pub fn add(&self, url: &str) -> Result<(), ChainError> {
        let mut nodes = self.list();
        if !nodes.iter().any(|u| u == url) {
            nodes.push(url.to_string());
            self.persist(&nodes)?;
        }
        Ok(())
    }

    /// Removes a node URL. A URL that is not registered is a no-op.
    pub fn remove(&self, url: &str) -> Result<(), ChainError> {
        let mut nodes = self.list();
        let before = nodes.len();
        nodes.retain(|u| u != url);
        if nodes.len() != before {
            self.persist(&nodes)?;
        }
        Ok(())
    }

    fn persist(&self, nodes: &[String]) -> Result<(), ChainError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(nodes)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
