//! Storage backends and utilities for sluice
//!
//! This crate provides the object store side of the pipeline:
//! - Amazon S3 and S3 compatible services (with the 's3' feature)
//! - Local filesystem, each bucket being a directory under a root
//! - In-memory storage (useful for testing)
//!
//! All backends are reached through a [`Bucket`], a cheaply cloneable handle that can be
//! shared between concurrently running work units.

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{memory::InMemory, path::Path, prefix::PrefixStore, ObjectStore, PutPayload};
use sluice_schemas::{ObjectStoreConfig, StoreBackend};
use std::{
    collections::HashSet,
    fmt,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use tracing::debug;

pub mod error;
pub use error::Error;
pub type Result<T> = core::result::Result<T, Error>;

/// Prelude module with commonly used types and functions
pub mod prelude;

#[cfg(feature = "s3")]
mod s3;

#[cfg(feature = "s3")]
pub use s3::S3Provider;

/// Outcome of making sure a bucket exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    Created,
    AlreadyExists,
}

/// Trait for object storage providers.
///
/// Each provider is responsible for:
/// - Creating object store instances scoped to a single bucket
/// - Creating buckets, treating an existing bucket as success
#[async_trait]
pub trait ObjectStoreProvider: Send + Sync + fmt::Debug {
    /// Create an object store whose paths are relative to `bucket`.
    fn create_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>>;

    /// Create `bucket` if it does not exist yet.
    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketStatus>;
}

/// Create the provider for the configured backend.
pub fn provider_for(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStoreProvider>> {
    match &config.backend {
        #[cfg(feature = "s3")]
        StoreBackend::S3 => Ok(Arc::new(S3Provider::new(config))),
        #[cfg(not(feature = "s3"))]
        StoreBackend::S3 => Err(Error::UnsupportedBackend(
            "s3 (compile with the 's3' feature)".to_string(),
        )),
        StoreBackend::Local { root } => Ok(Arc::new(LocalFileProvider::new(root.clone()))),
    }
}

/// Provider for the local file system.
///
/// Every bucket is a directory below `root`, object keys map to relative file paths.
#[derive(Debug, Clone)]
pub struct LocalFileProvider {
    root: PathBuf,
}

impl LocalFileProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }
}

#[async_trait]
impl ObjectStoreProvider for LocalFileProvider {
    fn create_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        // LocalFileSystem canonicalizes its prefix, the root has to exist
        std::fs::create_dir_all(&self.root).map_err(|source| Error::BucketDirectory {
            path: self.root.display().to_string(),
            source,
        })?;

        let fs = object_store::local::LocalFileSystem::new_with_prefix(&self.root)?;
        Ok(Arc::new(PrefixStore::new(fs, bucket)))
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketStatus> {
        let dir = self.bucket_dir(bucket);
        if dir.is_dir() {
            return Ok(BucketStatus::AlreadyExists);
        }

        std::fs::create_dir_all(&dir).map_err(|source| Error::BucketDirectory {
            path: dir.display().to_string(),
            source,
        })?;
        Ok(BucketStatus::Created)
    }
}

/// Provider for in-memory storage.
///
/// All buckets share one [`InMemory`] store and are separated by path prefix.
#[derive(Debug)]
pub struct InMemoryProvider {
    store: Arc<dyn ObjectStore>,
    buckets: Mutex<HashSet<String>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemory::new()),
            buckets: Mutex::new(HashSet::new()),
        }
    }
}

impl Default for InMemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStoreProvider for InMemoryProvider {
    fn create_store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        Ok(Arc::new(PrefixStore::new(Arc::clone(&self.store), bucket)))
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketStatus> {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if buckets.insert(bucket.to_string()) {
            Ok(BucketStatus::Created)
        } else {
            Ok(BucketStatus::AlreadyExists)
        }
    }
}

/// Handle to a single bucket of an object store.
///
/// Keys are plain strings, listing follows S3 semantics: every key that starts with the
/// given prefix matches, whether or not the prefix ends at a `/`.
#[derive(Clone)]
pub struct Bucket {
    name: String,
    store: Arc<dyn ObjectStore>,
    provider: Arc<dyn ObjectStoreProvider>,
}

impl Bucket {
    /// Connect to the bucket described by `config`
    pub fn connect(config: &ObjectStoreConfig) -> Result<Self> {
        let provider = provider_for(config)?;
        Self::with_provider(&config.bucket, provider)
    }

    /// Bucket backed by the given provider
    pub fn with_provider(
        name: impl Into<String>,
        provider: Arc<dyn ObjectStoreProvider>,
    ) -> Result<Self> {
        let name = name.into();
        let store = provider.create_store(&name)?;

        Ok(Self {
            name,
            store,
            provider,
        })
    }

    /// Fresh in-memory bucket
    pub fn in_memory(name: impl Into<String>) -> Self {
        let name = name.into();
        let provider = InMemoryProvider::new();
        let store: Arc<dyn ObjectStore> =
            Arc::new(PrefixStore::new(Arc::clone(&provider.store), name.as_str()));

        Self {
            name,
            store,
            provider: Arc::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The underlying object store, paths are relative to the bucket
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// Create the bucket if it is missing, an existing bucket is not an error
    pub async fn ensure_exists(&self) -> Result<BucketStatus> {
        let status = self.provider.ensure_bucket(&self.name).await?;
        debug!(bucket = %self.name, ?status, "Ensured bucket exists");
        Ok(status)
    }

    /// Write `bytes` to `key`, overwriting any existing object
    pub async fn put(&self, key: &str, bytes: Bytes) -> Result<()> {
        self.store
            .put(&object_path(key)?, PutPayload::from_bytes(bytes))
            .await?;
        Ok(())
    }

    /// Read the full content of `key`
    pub async fn get(&self, key: &str) -> Result<Bytes> {
        let bytes = self.store.get(&object_path(key)?).await?.bytes().await?;
        Ok(bytes)
    }

    /// All keys starting with `prefix`, sorted
    pub async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        // object_store lists whole path segments, so list the enclosing directory and
        // filter on the raw string prefix
        let parent = prefix
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty())
            .map(object_path)
            .transpose()?;

        let mut keys = self
            .store
            .list(parent.as_ref())
            .map_ok(|meta| meta.location.as_ref().to_string())
            .try_filter(|key| futures::future::ready(key.starts_with(prefix)))
            .try_collect::<Vec<_>>()
            .await?;

        keys.sort();
        Ok(keys)
    }
}

/// Keys are stored verbatim, `Path::from` would percent-encode characters such as `#` and `%`
fn object_path(key: &str) -> Result<Path> {
    Path::parse(key).map_err(|source| Error::InvalidKey {
        key: key.to_string(),
        source,
    })
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("name", &self.name)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
