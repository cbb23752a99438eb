//! Object store configuration.

use crate::error::ConfigError;
use crate::serde_helpers::default_region;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Backend holding the bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreBackend {
    /// Amazon S3 or an S3 compatible service such as MinIO
    #[default]
    S3,
    /// A directory on the local filesystem, each bucket is a sub directory of `root`
    Local { root: PathBuf },
}

/// Connection settings for the object store that receives the raw CSV files.
///
/// # Examples
///
/// ```
/// use sluice_schemas::ObjectStoreConfig;
///
/// let config = ObjectStoreConfig::builder()
///     .bucket("raw-csv".to_string())
///     .endpoint("http://localhost:9000".to_string())
///     .access_key_id("admin".to_string())
///     .secret_access_key("password".to_string())
///     .build();
///
/// assert!(config.validate().is_ok());
/// assert!(config.allow_http());
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "snake_case")]
pub struct ObjectStoreConfig {
    /// Storage backend, defaults to S3
    #[serde(default)]
    #[builder(default)]
    pub backend: StoreBackend,

    /// Custom endpoint for S3 compatible services, e.g. `http://localhost:9000`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Access key id, falls back to the provider's credential chain when unset
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Region of the bucket
    #[serde(default = "default_region")]
    #[builder(default = default_region())]
    pub region: String,

    /// Bucket name
    pub bucket: String,
}

impl ObjectStoreConfig {
    /// Plain HTTP is only allowed when the endpoint explicitly asks for it
    pub fn allow_http(&self) -> bool {
        self.endpoint
            .as_deref()
            .is_some_and(|endpoint| endpoint.starts_with("http://"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::EmptyBucket);
        }

        if self.bucket.contains('/') {
            return Err(ConfigError::InvalidBucket(self.bucket.clone()));
        }

        if let Some(endpoint) = &self.endpoint {
            Url::parse(endpoint).map_err(|e| ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                reason: e.to_string(),
            })?;
        }

        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) | (None, Some(_)) => Err(ConfigError::PartialCredentials),
            (Some(key), Some(secret))
                if self.backend == StoreBackend::S3
                    && (key.trim().is_empty() || secret.trim().is_empty()) =>
            {
                Err(ConfigError::EmptyCredentials)
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for ObjectStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "***"),
            )
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minio() -> ObjectStoreConfig {
        ObjectStoreConfig::builder()
            .bucket("raw-csv".to_string())
            .endpoint("http://localhost:9000".to_string())
            .access_key_id("admin".to_string())
            .secret_access_key("password".to_string())
            .build()
    }

    #[test]
    fn debug_output_hides_secret() {
        let debug = format!("{:?}", minio());
        assert!(debug.contains("admin"));
        assert!(!debug.contains("password"));
    }

    #[test]
    fn https_endpoint_disallows_http() {
        let mut config = minio();
        config.endpoint = Some("https://s3.eu-west-1.amazonaws.com".to_string());
        assert!(!config.allow_http());

        config.endpoint = None;
        assert!(!config.allow_http());
    }

    #[test]
    fn validation_errors() {
        let mut config = minio();
        config.bucket = " ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::EmptyBucket));

        let mut config = minio();
        config.bucket = "raw/csv".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBucket(_))
        ));

        let mut config = minio();
        config.endpoint = Some("not a url".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));

        let mut config = minio();
        config.secret_access_key = None;
        assert_eq!(config.validate(), Err(ConfigError::PartialCredentials));

        let mut config = minio();
        config.access_key_id = Some(String::new());
        config.secret_access_key = Some(String::new());
        assert_eq!(config.validate(), Err(ConfigError::EmptyCredentials));

        let mut config = minio();
        config.secret_access_key = Some("  ".to_string());
        assert_eq!(config.validate(), Err(ConfigError::EmptyCredentials));

        // credentials are not used by a local bucket
        let mut config = minio();
        config.backend = StoreBackend::Local {
            root: PathBuf::from("/tmp/lake"),
        };
        config.access_key_id = Some(String::new());
        config.secret_access_key = Some(String::new());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn backend_deserializes_from_tagged_json() {
        let config: ObjectStoreConfig = serde_json::from_str(
            r#"{"bucket": "raw-csv", "backend": {"type": "local", "root": "/tmp/lake"}}"#,
        )
        .unwrap();

        assert_eq!(
            config.backend,
            StoreBackend::Local {
                root: PathBuf::from("/tmp/lake")
            }
        );
        assert_eq!(config.region, "us-east-1");
    }
}
