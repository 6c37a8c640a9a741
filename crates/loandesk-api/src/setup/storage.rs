//! Storage setup and initialization

use anyhow::Result;
use loandesk_core::Config;
use loandesk_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage...");
    let storage = create_storage(config).await?;
    tracing::info!(backend = %storage.backend_type(), "Storage initialized");
    Ok(storage)
}

/// Path under which local artifacts are served, taken from the public base
/// URL: `http://localhost:8000/temp` mounts at `/temp`.
pub fn local_mount_path(base_url: &str) -> Option<String> {
    let without_scheme = base_url.split_once("://").map(|(_, rest)| rest).unwrap_or(base_url);
    let path = without_scheme
        .find('/')
        .map(|idx| &without_scheme[idx..])
        .unwrap_or("");
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_mount_path() {
        assert_eq!(local_mount_path("http://localhost:8000/temp"), Some("/temp".into()));
        assert_eq!(local_mount_path("https://cdn.example.com/files/"), Some("/files".into()));
        assert_eq!(local_mount_path("http://localhost:8000"), None);
    }
}
