//! Filesystem-backed [`ObjectStore`].
//!
//! Blobs live under a root directory at their object path. Downloads go
//! through the `/files` route, which only serves requests carrying a valid
//! HMAC signature produced by [`ObjectStore::signed_url`].

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use surat_core::error::CoreError;
use surat_core::ports::ObjectStore;
use surat_core::storage::{signed_url, validate_storage_path, verify_signature};
use uuid::Uuid;

use crate::config::StorageConfig;

pub struct LocalObjectStore {
    root: PathBuf,
    public_url: String,
    signing_secret: Vec<u8>,
}

impl LocalObjectStore {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            public_url: config.public_url.trim_end_matches('/').to_string(),
            signing_secret: config.signing_secret.as_bytes().to_vec(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, CoreError> {
        validate_storage_path(path)?;
        Ok(self.root.join(path))
    }

    /// Whether `signature` authorizes downloading `path` until `expires_at`.
    pub fn verify(&self, path: &str, expires_at: i64, signature: &str) -> bool {
        verify_signature(
            &self.signing_secret,
            path,
            expires_at,
            signature,
            Utc::now().timestamp(),
        )
    }

    /// Read a stored blob. `None` when nothing is stored at `path`.
    pub async fn read(&self, path: &str) -> Result<Option<Vec<u8>>, CoreError> {
        let full = self.resolve(path)?;
        match tokio::fs::read(&full).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::Internal(format!("Failed to read {path}: {e}"))),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, path: &str, bytes: &[u8], mime_type: &str) -> Result<String, CoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::FileUpload(format!("Failed to prepare {path}: {e}")))?;
        }
        // Stage beside the target and rename into place; a failed write
        // never shows up at `path`.
        let staged = full.with_file_name(format!(".{}.part", Uuid::new_v4()));
        let written = match tokio::fs::write(&staged, bytes).await {
            Ok(()) => tokio::fs::rename(&staged, &full).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&staged).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(path, error = %cleanup, "Failed to remove partial blob");
                }
            }
            return Err(CoreError::FileUpload(format!("Failed to write {path}: {e}")));
        }

        tracing::debug!(path, mime_type, bytes = bytes.len(), "Blob stored");
        Ok(format!("{}/{path}", self.public_url))
    }

    async fn remove(&self, paths: &[String]) -> Result<(), CoreError> {
        let mut failures = Vec::new();
        for path in paths {
            let full = match self.resolve(path) {
                Ok(full) => full,
                Err(e) => {
                    failures.push(e.to_string());
                    continue;
                }
            };
            match tokio::fs::remove_file(&full).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => failures.push(format!("{path}: {e}")),
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Internal(format!(
                "Failed to remove blobs: {}",
                failures.join("; ")
            )))
        }
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, CoreError> {
        validate_storage_path(path)?;
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        Ok(signed_url(
            &self.public_url,
            &self.signing_secret,
            path,
            expires_at,
        ))
    }
}
