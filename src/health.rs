//! Health monitoring for bounded pools

use crate::pool::PoolSize;

/// Health status of a pool
///
/// # Examples
///
/// ```
/// use bounded_pool::{BoundedPool, PoolConfiguration};
///
/// let config = PoolConfiguration::new().with_warmup(3);
/// let pool = BoundedPool::new(|| Ok::<_, std::io::Error>(vec![0u8; 64]), config).unwrap();
///
/// let health = pool.get_health_status();
/// assert!(health.is_healthy());
/// assert_eq!(health.idle_objects, 3);
/// ```
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Whether the pool is healthy
    pub is_healthy: bool,

    /// Number of warnings detected
    pub warning_count: usize,

    /// Current pool utilization (0.0 to 1.0)
    pub utilization: f64,

    pub idle_objects: usize,
    pub in_use_objects: usize,

    /// Instances issued so far (idle + in use)
    pub total_objects: usize,

    /// Maximum capacity
    pub total_capacity: usize,

    /// Warning messages
    pub warnings: Vec<String>,
}

impl HealthStatus {
    pub fn new(size: PoolSize, capacity: usize) -> Self {
        let utilization = size.utilization(capacity);

        let mut warnings = Vec::new();
        let mut is_healthy = true;

        // Check for high utilization
        if utilization > 0.9 {
            warnings.push(format!("High utilization: {:.1}%", utilization * 100.0));
            is_healthy = false;
        }

        if size.idle == 0 && size.total >= capacity {
            warnings.push("Pool is exhausted".to_string());
        }

        Self {
            is_healthy,
            warning_count: warnings.len(),
            utilization,
            idle_objects: size.idle,
            in_use_objects: size.in_use,
            total_objects: size.total,
            total_capacity: capacity,
            warnings,
        }
    }

    /// Check if the pool is healthy
    pub fn is_healthy(&self) -> bool {
        self.is_healthy
    }
}
