//! Installed manifest store.
//!
//! Written by the install path, read by the execution path. Lives in memory; how it
//! is persisted across restarts is up to the embedding process (`snapshot`/`restore`).

use super::types::FunctionManifest;

use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
pub struct ManifestStore {
    manifests: DashMap<String, FunctionManifest>,
}

impl ManifestStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Inserts or replaces the manifest for its function id.
    /// Returns the manifest it replaced, if any.
    pub fn insert(&self, manifest: FunctionManifest) -> Option<FunctionManifest> {
        self.manifests
            .insert(manifest.function_id.clone(), manifest)
    }

    pub fn get(&self, function_id: &str) -> Option<FunctionManifest> {
        self.manifests
            .get(function_id)
            .map(|entry| entry.value().clone())
    }

    pub fn contains(&self, function_id: &str) -> bool {
        self.manifests.contains_key(function_id)
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    pub fn snapshot(&self) -> Vec<FunctionManifest> {
        let mut manifests: Vec<FunctionManifest> = self
            .manifests
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        manifests.sort_by(|a, b| a.function_id.cmp(&b.function_id));
        manifests
    }

    pub fn restore(&self, manifests: Vec<FunctionManifest>) {
        for manifest in manifests {
            self.insert(manifest);
        }
    }
}
