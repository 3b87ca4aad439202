//! Error types for the bounded pool

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Boxed error produced by a [`Factory`](crate::Factory).
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug, Clone)]
pub enum PoolError {
    /// The factory failed while the pool was growing. No capacity was consumed.
    #[error("Failed to construct a pooled instance: {0}")]
    ConstructionFailed(#[source] Arc<dyn StdError + Send + Sync + 'static>),

    /// Fail-fast policy and neither an idle instance nor free capacity.
    #[error("Pool exhausted - no idle instance and maximum size reached")]
    Exhausted,

    #[error("Timed out after {0:?} waiting for an instance to return to the pool")]
    Timeout(Duration),

    /// The waiting caller was cancelled through its [`CancelToken`](crate::CancelToken).
    /// The token stays cancelled.
    #[error("Cancelled while waiting for an instance to return to the pool")]
    Cancelled,

    #[error("Released instance is not in use in this pool")]
    InvalidRelease,

    #[error("Invalid pool configuration: {0}")]
    InvalidConfiguration(String),
}

impl PoolError {
    pub(crate) fn construction(err: BoxError) -> Self {
        PoolError::ConstructionFailed(Arc::from(err))
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
