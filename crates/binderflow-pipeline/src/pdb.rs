//! Structural input loading and ATOM record filtering.

use binderflow_common::{BinderError, Result};
use reqwest::Client;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Record name of coordinate lines kept for folding.
pub const COORDINATE_RECORD: &str = "ATOM";

/// Keeps only coordinate records, in file order, newline-joined.
///
/// Idempotent: filtering an already filtered structure returns it unchanged.
pub fn filter_atom_records(content: &str) -> String {
    content
        .split('\n')
        .filter(|line| line.starts_with(COORDINATE_RECORD))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Loads precomputed structures, fetching and caching a remote copy when the
/// local file is absent.
#[derive(Debug, Clone, Default)]
pub struct StructureLoader {
    client: Client,
}

impl StructureLoader {
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Reads `path` and returns its coordinate records.
    pub async fn reduce(&self, path: &Path, source_url: Option<&str>) -> Result<String> {
        if !path.exists() {
            match source_url {
                Some(url) => self.fetch_into(url, path).await?,
                None => return Err(BinderError::InputNotFound(path.to_path_buf())),
            }
        }

        let content = fs::read_to_string(path).await?;
        let reduced = filter_atom_records(&content);
        debug!(
            path = %path.display(),
            records = reduced.lines().count(),
            "Reduced structure to coordinate records"
        );
        Ok(reduced)
    }

    async fn fetch_into(&self, url: &str, path: &Path) -> Result<()> {
        info!("Structure {} not found locally, fetching {}", path.display(), url);
        let fetch_err = |reason: String| BinderError::Fetch { url: url.to_string(), reason };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("status {}", status.as_u16())));
        }
        let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| fetch_err(e.to_string()))?;
        }
        fs::write(path, body).await.map_err(|e| fetch_err(e.to_string()))?;
        debug!("Cached {} at {}", url, path.display());
        Ok(())
    }
}
