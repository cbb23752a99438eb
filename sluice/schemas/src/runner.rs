//! Task runner configuration.

use crate::error::ConfigError;
use crate::serde_helpers::{default_concurrency, default_max_retries, default_retry_delay_ms};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Scheduling and retry settings for per-file work units.
///
/// A `concurrency` of 1 runs sibling units one after another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Maximum number of units in flight
    #[serde(default = "default_concurrency")]
    #[builder(default = default_concurrency())]
    pub concurrency: usize,

    /// Retries after the first attempt, only for transient failures
    #[serde(default = "default_max_retries")]
    #[builder(default = default_max_retries())]
    pub max_retries: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay_ms")]
    #[builder(default = default_retry_delay_ms())]
    pub retry_delay_ms: u64,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RunnerConfig {
    /// Run units one at a time without retries
    pub fn sequential() -> Self {
        Self::builder().concurrency(1).max_retries(0).build()
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }
}
