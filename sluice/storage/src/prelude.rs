//! Prelude module that exports commonly used types and functions.
//!
//! This module provides a convenient way to import all the necessary
//! components with a single `use sluice_storage::prelude::*;` statement.

pub use crate::{
    provider_for, Bucket, BucketStatus, Error, InMemoryProvider, LocalFileProvider,
    ObjectStoreProvider, Result,
};

#[cfg(feature = "s3")]
pub use crate::S3Provider;
