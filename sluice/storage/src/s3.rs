//! # S3 Object Store Provider
//!
//! Amazon S3 and S3 compatible services such as MinIO. Object access goes through the
//! `object_store` crate's S3 backend, bucket creation through `aws-sdk-s3` since
//! `object_store` has no bucket management.

use super::{BucketStatus, ObjectStoreProvider};
use crate::error::Error;
use crate::Result;
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::SdkError,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use object_store::aws::AmazonS3Builder;
use sluice_schemas::ObjectStoreConfig;
use std::{fmt, sync::Arc};
use tracing::debug;

/// Region in which buckets are created without a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// Provider for Amazon S3 and S3-compatible storage.
///
/// Explicit settings from [`ObjectStoreConfig`] take precedence; anything unset falls back to
/// the `AWS_*` environment variables read by [`AmazonS3Builder::from_env`].
pub struct S3Provider {
    config: ObjectStoreConfig,
    client: Client,
}

impl S3Provider {
    pub fn new(config: &ObjectStoreConfig) -> Self {
        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .region(Region::new(config.region.clone()))
            .force_path_style(true);

        if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let credentials = Credentials::new(access_key, secret_key, None, None, "sluice");
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        Self {
            config: config.clone(),
            client: Client::from_conf(s3_config_builder.build()),
        }
    }
}

impl fmt::Debug for S3Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Provider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStoreProvider for S3Provider {
    fn create_store(&self, bucket: &str) -> Result<Arc<dyn object_store::ObjectStore>> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(&self.config.region)
            .with_allow_http(self.config.allow_http());

        if let Some(endpoint) = &self.config.endpoint {
            // S3 compatible services are addressed with path style requests
            builder = builder
                .with_endpoint(endpoint)
                .with_virtual_hosted_style_request(false);
        }

        if let (Some(access_key), Some(secret_key)) =
            (&self.config.access_key_id, &self.config.secret_access_key)
        {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);
        }

        builder
            .build()
            .map(|store| Arc::new(store) as Arc<dyn object_store::ObjectStore>)
            .map_err(|e| Error::ObjectStoreCreation {
                bucket: bucket.to_string(),
                reason: e.to_string(),
            })
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<BucketStatus> {
        let mut request = self.client.create_bucket().bucket(bucket);

        if self.config.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(
                        self.config.region.as_str(),
                    ))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(BucketStatus::Created),
            Err(err) => {
                let already_exists = err.as_service_error().is_some_and(|service_err| {
                    service_err.is_bucket_already_owned_by_you()
                        || service_err.is_bucket_already_exists()
                });

                if already_exists {
                    debug!("Bucket '{bucket}' already exists");
                    return Ok(BucketStatus::AlreadyExists);
                }

                let transient = matches!(
                    err,
                    SdkError::DispatchFailure(_)
                        | SdkError::TimeoutError(_)
                        | SdkError::ResponseError(_)
                );

                Err(Error::CreateBucket {
                    bucket: bucket.to_string(),
                    transient,
                    source: Box::new(err),
                })
            }
        }
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

    #[tokio::test]
    async fn creates_store_for_minio_endpoint() {
        let provider = S3Provider::new(&minio());
        assert!(provider.create_store("raw-csv").is_ok());
    }

    #[tokio::test]
    async fn debug_output_hides_secret() {
        let provider = S3Provider::new(&minio());
        assert!(!format!("{provider:?}").contains("password"));
    }
}
