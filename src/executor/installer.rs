//! HTTP manifest installer.
//!
//! Fetches a `FunctionManifest` as JSON from its URL and records it in the local
//! `ManifestStore`. Transient network failures are retried with exponential backoff.

use super::manifest::ManifestStore;
use super::types::{FunctionInstaller, FunctionManifest};
use crate::transport::BoxFuture;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

const FETCH_TIMEOUT: Duration = Duration::from_secs(5);
const FETCH_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct HttpInstaller {
    store: Arc<ManifestStore>,
    http_client: reqwest::Client,
}

impl HttpInstaller {
    pub fn new(store: Arc<ManifestStore>) -> Arc<Self> {
        Arc::new(Self {
            store,
            http_client: reqwest::Client::new(),
        })
    }

    async fn fetch_and_store(self, manifest_url: String) -> Result<FunctionManifest> {
        tracing::info!("Installing function from {}", manifest_url);

        let response = self
            .get_with_retry(&manifest_url, FETCH_TIMEOUT, FETCH_ATTEMPTS)
            .await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Manifest fetch failed: {} returned {}",
                manifest_url,
                response.status()
            ));
        }

        let manifest: FunctionManifest = response.json().await?;

        if manifest.function_id.trim().is_empty() {
            return Err(anyhow::anyhow!("Manifest at {} has no function_id", manifest_url));
        }
        if manifest.entry.trim().is_empty() {
            return Err(anyhow::anyhow!(
                "Manifest for {} has no entry",
                manifest.function_id
            ));
        }

        if self.store.insert(manifest.clone()).is_some() {
            tracing::info!("Replaced installed function {}", manifest.function_id);
        } else {
            tracing::info!(
                "Installed function {} ({} v{})",
                manifest.function_id,
                manifest.name,
                manifest.version
            );
        }

        Ok(manifest)
    }

    async fn get_with_retry(
        &self,
        url: &str,
        timeout: Duration,
        attempts: usize,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self.http_client.get(url).timeout(timeout).send().await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(anyhow::anyhow!(e));
                    }
                    tracing::debug!("Manifest fetch attempt {} failed: {}", attempt + 1, e);
                    // Jitter keeps a fleet of installers from retrying in lockstep.
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(anyhow::anyhow!("Retry attempts exhausted"))
    }
}

impl FunctionInstaller for HttpInstaller {
    fn install(&self, manifest_url: String) -> BoxFuture<'static, Result<FunctionManifest>> {
        Box::pin(self.clone().fetch_and_store(manifest_url))
    }
}
