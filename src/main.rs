// Small demonstration binary - the library lives in lib.rs
// Run examples with: cargo run --example basic
// Set RUST_LOG=bounded_pool=debug to watch the pool at work.

use std::thread;
use std::time::Duration;

use bounded_pool::{BoundedPool, PoolConfiguration, PoolError};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), PoolError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== bounded_pool ===");
    println!("See demos/ directory for usage examples");
    println!();

    let config = PoolConfiguration::new()
        .with_max_pool_size(2)
        .with_timeout(Duration::from_millis(200));
    let pool = BoundedPool::new(|| Ok::<_, std::io::Error>(String::with_capacity(256)), config)?;

    let first = pool.acquire()?;
    let _second = pool.acquire()?;
    println!("  Pool full: {:?}", pool.current_size());

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire().map(|s| s.capacity()))
    };
    thread::sleep(Duration::from_millis(50));
    drop(first);

    match waiter.join() {
        Ok(Ok(capacity)) => println!("  Waiter got a buffer with capacity {}", capacity),
        Ok(Err(e)) => println!("  Waiter failed: {}", e),
        Err(_) => println!("  Waiter panicked"),
    }

    let _third = pool.acquire()?;
    match pool.acquire() {
        Err(PoolError::Timeout(after)) => println!("  Timed out after {:?} as expected", after),
        other => println!("  Unexpected: {:?}", other.map(|s| s.len())),
    }

    println!("  Final size: {:?}", pool.current_size());
    Ok(())
}
