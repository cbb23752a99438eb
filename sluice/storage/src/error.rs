//! Error types for storage operations

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum Error {
    /// Object store creation failed
    #[error("Failed to create object store for bucket '{bucket}': {reason}")]
    ObjectStoreCreation { bucket: String, reason: String },

    /// Backend not compiled in
    #[error("Storage backend not supported: {0}")]
    UnsupportedBackend(String),

    /// Bucket creation failed for a reason other than the bucket already existing
    #[error("Failed to create bucket '{bucket}': {source}")]
    CreateBucket {
        bucket: String,
        transient: bool,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Local bucket directory could not be created
    #[error("Failed to create bucket directory '{path}': {source}")]
    BucketDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Key not representable as an object path
    #[error("Invalid object key '{key}': {source}")]
    InvalidKey {
        key: String,
        #[source]
        source: object_store::path::Error,
    },

    /// Object store error
    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),
}

impl Error {
    /// Whether retrying the same operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Error::CreateBucket { transient, .. } => *transient,
            // object_store reports network and server failures as generic errors
            Error::ObjectStore(object_store::Error::Generic { .. }) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_object_store_errors_are_transient() {
        let err = Error::from(object_store::Error::Generic {
            store: "S3",
            source: "connection reset".into(),
        });
        assert!(err.is_transient());

        let err = Error::from(object_store::Error::NotFound {
            path: "raw/orders.csv".to_string(),
            source: "missing".into(),
        });
        assert!(!err.is_transient());
    }
}
