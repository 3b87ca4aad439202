//! # bounded_pool
//!
//! Bounded, thread-safe object pool for expensive-to-construct, reusable resources.
//!
//! ## Features
//!
//! - Lazy construction through a pluggable [`Factory`], up to a maximum size
//! - Reset-or-discard of returned instances through a pluggable [`Resetter`]
//! - Fail-fast, blocking and deadline-bounded wait policies
//! - Cancellation of blocked acquisitions with [`CancelToken`]
//! - Automatic return of objects via RAII (Drop trait)
//! - Async acquisition on tokio's blocking pool
//! - Pool warm-up/pre-population
//! - Health monitoring and metrics, with Prometheus export
//!
//! ## Quick Start
//!
//! ```rust
//! use bounded_pool::{BoundedPool, PoolConfiguration};
//! use std::time::Duration;
//!
//! let config = PoolConfiguration::new()
//!     .with_max_pool_size(4)
//!     .with_timeout(Duration::from_millis(500));
//!
//! let pool = BoundedPool::with_resetter(
//!     || Ok::<_, std::io::Error>(Vec::<u8>::with_capacity(1024)),
//!     |buf: &mut Vec<u8>| {
//!         buf.clear();
//!         true
//!     },
//!     config,
//! )
//! .unwrap();
//!
//! {
//!     let mut buf = pool.acquire().unwrap();
//!     buf.extend_from_slice(b"hello");
//!     // Buffer is reset and returned when `buf` goes out of scope
//! }
//! assert_eq!(pool.current_size().idle, 1);
//! ```

mod cancel;
mod config;
mod errors;
mod health;
mod lifecycle;
mod metrics;
mod pool;

pub use cancel::{CancelOnDrop, CancelToken};
pub use config::{MaxSize, PoolConfiguration, WaitPolicy};
pub use errors::{BoxError, PoolError, PoolResult};
pub use health::HealthStatus;
pub use lifecycle::{AcceptAll, Factory, Resetter};
#[cfg(feature = "metrics")]
pub use metrics::MetricsExporter;
pub use metrics::PoolMetrics;
pub use pool::{AcquireOptions, BoundedPool, PoolSize, PooledObject};
