// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object store contract and implementations.
//!
//! The production store is eventually consistent blob storage with
//! overwrite-allowed semantics and no transactional coupling. The trait
//! mirrors exactly the operations the core consumes.

use async_trait::async_trait;
use rw_core::{CoreError, Result};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Blob storage as consumed by the coordinator. I/O failures surface as
/// `internal` errors; a missing key is `notFound`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload_object(
        &self,
        cancel: &CancellationToken,
        key: &str,
        body: Vec<u8>,
    ) -> Result<()>;

    async fn download_object(
        &self,
        cancel: &CancellationToken,
        key: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()>;

    async fn get_object_stream(
        &self,
        cancel: &CancellationToken,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>>;

    async fn object_exists(&self, cancel: &CancellationToken, key: &str) -> Result<bool>;

    async fn presigned_url(&self, cancel: &CancellationToken, key: &str) -> Result<String>;
}

fn check_cancel(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(CoreError::internal("object-store operation canceled"))
    } else {
        Ok(())
    }
}

/// Filesystem-backed object store for single-node deployments.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload_object(
        &self,
        cancel: &CancellationToken,
        key: &str,
        body: Vec<u8>,
    ) -> Result<()> {
        check_cancel(cancel)?;
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::internal(format!("creating {}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| CoreError::internal(format!("writing {}: {}", key, e)))?;
        tracing::debug!(key, "object uploaded");
        Ok(())
    }

    async fn download_object(
        &self,
        cancel: &CancellationToken,
        key: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        check_cancel(cancel)?;
        let mut reader = self.get_object_stream(cancel, key).await?;
        tokio::io::copy(&mut reader, writer)
            .await
            .map_err(|e| CoreError::internal(format!("reading {}: {}", key, e)))?;
        writer
            .flush()
            .await
            .map_err(|e| CoreError::internal(format!("flushing {}: {}", key, e)))?;
        Ok(())
    }

    async fn get_object_stream(
        &self,
        cancel: &CancellationToken,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        check_cancel(cancel)?;
        let path = self.path(key);
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CoreError::not_found(format!("object {} not found", key)))
            }
            Err(e) => Err(CoreError::internal(format!("opening {}: {}", key, e))),
        }
    }

    async fn object_exists(&self, cancel: &CancellationToken, key: &str) -> Result<bool> {
        check_cancel(cancel)?;
        tokio::fs::try_exists(self.path(key))
            .await
            .map_err(|e| CoreError::internal(format!("probing {}: {}", key, e)))
    }

    async fn presigned_url(&self, cancel: &CancellationToken, key: &str) -> Result<String> {
        check_cancel(cancel)?;
        // No signer on the filesystem store; hand back a local URL.
        Ok(format!("file://{}", self.path(key).display()))
    }
}

/// In-memory object store with induced-failure support.
#[cfg(any(test, feature = "test-support"))]
pub struct MemoryObjectStore {
    objects: parking_lot::Mutex<std::collections::HashMap<String, Vec<u8>>>,
    fail_uploads: std::sync::atomic::AtomicBool,
}

#[cfg(any(test, feature = "test-support"))]
impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: parking_lot::Mutex::new(std::collections::HashMap::new()),
            fail_uploads: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Make every subsequent upload fail with an internal error.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn contents(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(any(test, feature = "test-support"))]
impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload_object(
        &self,
        cancel: &CancellationToken,
        key: &str,
        body: Vec<u8>,
    ) -> Result<()> {
        check_cancel(cancel)?;
        if self.fail_uploads.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(CoreError::internal("induced upload failure"));
        }
        self.objects.lock().insert(key.to_string(), body);
        Ok(())
    }

    async fn download_object(
        &self,
        cancel: &CancellationToken,
        key: &str,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<()> {
        check_cancel(cancel)?;
        let body = self
            .contents(key)
            .ok_or_else(|| CoreError::not_found(format!("object {} not found", key)))?;
        writer
            .write_all(&body)
            .await
            .map_err(|e| CoreError::internal(format!("writing {}: {}", key, e)))?;
        Ok(())
    }

    async fn get_object_stream(
        &self,
        cancel: &CancellationToken,
        key: &str,
    ) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
        check_cancel(cancel)?;
        let body = self
            .contents(key)
            .ok_or_else(|| CoreError::not_found(format!("object {} not found", key)))?;
        Ok(Box::new(std::io::Cursor::new(body)))
    }

    async fn object_exists(&self, cancel: &CancellationToken, key: &str) -> Result<bool> {
        check_cancel(cancel)?;
        Ok(self.objects.lock().contains_key(key))
    }

    async fn presigned_url(&self, cancel: &CancellationToken, key: &str) -> Result<String> {
        check_cancel(cancel)?;
        Ok(format!("memory://{}", key))
    }
}

#[cfg(test)]
#[path = "object_store_tests.rs"]
mod tests;
