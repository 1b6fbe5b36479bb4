//! Bounded retry for acquiring the storage connection at startup

use crate::config::RetryConfig;
use std::fmt::Display;
use std::time::Duration;

/// Fixed-count retry policy with a linearly growing delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts made after the first failure
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Added to the delay after every retry
    pub delay_step: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: Duration::from_secs(config.initial_delay_secs),
            delay_step: Duration::from_secs(config.delay_step_secs),
        }
    }

    /// A policy that gives up after the first failure
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            delay_step: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (0-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.initial_delay + self.delay_step * retry
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Runs `connect` until it succeeds or the policy is exhausted
///
/// # Arguments
///
/// * `policy` - How many times to retry and how long to wait in between
/// * `target` - Human-readable name of what is being opened, for logging
/// * `connect` - The fallible acquisition
///
/// # Returns
///
/// The first successful result, or the error from the final attempt
pub async fn connect_with_retry<T, E, F>(
    policy: &RetryPolicy,
    target: &str,
    mut connect: F,
) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: Display,
{
    let mut retry = 0;
    loop {
        match connect() {
            Ok(value) => {
                if retry > 0 {
                    tracing::info!("Connected to {} after {} retries", target, retry);
                }
                return Ok(value);
            }
            Err(e) if retry < policy.max_retries => {
                let delay = policy.delay_for(retry);
                tracing::warn!(
                    "Failed to open {} ({}), retrying in {:?} ({}/{})",
                    target,
                    e,
                    delay,
                    retry + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
                retry += 1;
            }
            Err(e) => {
                tracing::error!("Giving up on {} after {} retries: {}", target, retry, e);
                return Err(e);
            }
        }
    }
}
