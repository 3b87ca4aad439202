//! Pool configuration options

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::{PoolError, PoolResult};

/// Upper bound on the number of instances a pool may issue at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MaxSize {
    /// At most this many instances, idle and in use combined
    Bounded(usize),

    /// No cap; treated as `usize::MAX`
    Unlimited,
}

impl MaxSize {
    /// The numeric bound enforced by the pool
    pub fn limit(self) -> usize {
        match self {
            MaxSize::Bounded(n) => n,
            MaxSize::Unlimited => usize::MAX,
        }
    }
}

/// What `acquire` does when no instance is idle and the pool is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WaitPolicy {
    /// Return [`PoolError::Exhausted`] immediately
    #[default]
    FailFast,

    /// Wait until an instance is returned or capacity frees up
    BlockIndefinitely,

    /// Wait at most this long in total, then return [`PoolError::Timeout`]
    BlockWithTimeout(Duration),
}

/// Configuration for pool behavior
///
/// # Examples
///
/// ```
/// use bounded_pool::{MaxSize, PoolConfiguration, WaitPolicy};
/// use std::time::Duration;
///
/// let config = PoolConfiguration::new()
///     .with_max_pool_size(16)
///     .with_timeout(Duration::from_millis(250))
///     .with_warmup(4);
///
/// assert_eq!(config.max_size, MaxSize::Bounded(16));
/// assert_eq!(config.wait_policy, WaitPolicy::BlockWithTimeout(Duration::from_millis(250)));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PoolConfiguration {
    /// Maximum number of instances issued at once (idle + in use)
    pub max_size: MaxSize,

    /// Behavior of `acquire` when the pool is exhausted
    pub wait_policy: WaitPolicy,

    /// Number of instances to construct when the pool is created
    #[cfg_attr(feature = "serde", serde(default))]
    pub warmup_size: Option<usize>,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_size: MaxSize::Bounded(8),
            wait_policy: WaitPolicy::FailFast,
            warmup_size: None,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum pool size
    ///
    /// # Examples
    ///
    /// ```
    /// use bounded_pool::{MaxSize, PoolConfiguration};
    ///
    /// let config = PoolConfiguration::new().with_max_pool_size(50);
    ///
    /// assert_eq!(config.max_size, MaxSize::Bounded(50));
    /// ```
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_size = MaxSize::Bounded(size);
        self
    }

    /// Remove the size cap
    pub fn unlimited(mut self) -> Self {
        self.max_size = MaxSize::Unlimited;
        self
    }

    pub fn with_wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait_policy = policy;
        self
    }

    /// Block on exhaustion for at most `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.wait_policy = WaitPolicy::BlockWithTimeout(timeout);
        self
    }

    /// Block on exhaustion until an instance is available
    pub fn blocking(mut self) -> Self {
        self.wait_policy = WaitPolicy::BlockIndefinitely;
        self
    }

    /// Fail immediately on exhaustion
    pub fn fail_fast(mut self) -> Self {
        self.wait_policy = WaitPolicy::FailFast;
        self
    }

    /// Set warm-up size
    pub fn with_warmup(mut self, size: usize) -> Self {
        self.warmup_size = Some(size);
        self
    }

    /// Check the configuration for values the pool cannot honor.
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_size == MaxSize::Bounded(0) {
            return Err(PoolError::InvalidConfiguration(
                "max_size must be greater than 0".to_string(),
            ));
        }
        if self.wait_policy == WaitPolicy::BlockWithTimeout(Duration::ZERO) {
            return Err(PoolError::InvalidConfiguration(
                "timeout must be greater than zero, use FailFast instead".to_string(),
            ));
        }
        if let Some(warmup) = self.warmup_size
            && warmup > self.max_size.limit()
        {
            return Err(PoolError::InvalidConfiguration(format!(
                "warmup_size ({}) must not exceed max_size ({})",
                warmup,
                self.max_size.limit()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfiguration::default();
        assert_eq!(config.max_size, MaxSize::Bounded(8));
        assert_eq!(config.wait_policy, WaitPolicy::FailFast);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unlimited_is_largest_bound() {
        let config = PoolConfiguration::new().unlimited();
        assert_eq!(config.max_size.limit(), usize::MAX);
    }

    #[test]
    fn test_policy_builders_override_each_other() {
        let config = PoolConfiguration::new()
            .with_timeout(Duration::from_secs(1))
            .blocking();
        assert_eq!(config.wait_policy, WaitPolicy::BlockIndefinitely);

        let config = config.fail_fast();
        assert_eq!(config.wait_policy, WaitPolicy::FailFast);
    }

    #[test]
    fn test_validate_rejects_zero_size() {
        let config = PoolConfiguration::new().with_max_pool_size(0);
        assert!(matches!(
            config.validate(),
            Err(PoolError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = PoolConfiguration::new().with_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_warmup() {
        let config = PoolConfiguration::new().with_max_pool_size(2).with_warmup(3);
        assert!(config.validate().is_err());

        let config = PoolConfiguration::new().unlimited().with_warmup(3);
        assert!(config.validate().is_ok());
    }
}
