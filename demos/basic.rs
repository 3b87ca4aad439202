//! Basic usage examples for BoundedPool

use bounded_pool::{AcquireOptions, BoundedPool, CancelToken, PoolConfiguration, PoolError};
use std::thread;
use std::time::Duration;

/// A stand-in for something expensive to build, like a parser with large tables.
struct Parser {
    id: usize,
    scratch: Vec<u8>,
    poisoned: bool,
}

fn main() {
    println!("=== bounded_pool - Basic Examples ===\n");

    // Example 1: Fail-fast pool
    fail_fast_pool();

    // Example 2: Resetter that normalizes or rejects
    resetting_pool();

    // Example 3: Blocking with a timeout
    timed_pool();

    // Example 4: Cancelling a blocked acquire
    cancelled_wait();

    // Example 5: Metrics and health
    metrics_and_health();
}

fn parser_factory() -> impl Fn() -> Result<Parser, std::io::Error> + Send + Sync {
    let next = std::sync::atomic::AtomicUsize::new(0);
    move || {
        Ok(Parser {
            id: next.fetch_add(1, std::sync::atomic::Ordering::Relaxed),
            scratch: Vec::with_capacity(4096),
            poisoned: false,
        })
    }
}

fn fail_fast_pool() {
    println!("1. Fail-Fast Pool:");
    let pool = BoundedPool::new(parser_factory(), PoolConfiguration::new().with_max_pool_size(2))
        .unwrap();

    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    println!("   Got parsers {} and {}", a.id, b.id);

    match pool.acquire() {
        Err(PoolError::Exhausted) => println!("   Third acquire: exhausted"),
        other => println!("   Third acquire: {:?}", other.map(|p| p.id)),
    }

    pool.release(a).unwrap();
    let again = pool.acquire().unwrap();
    println!("   Reused parser {}, size {:?}\n", again.id, pool.current_size());
}

fn resetting_pool() {
    println!("2. Resetting Pool:");
    let pool = BoundedPool::with_resetter(
        parser_factory(),
        |parser: &mut Parser| {
            parser.scratch.clear();
            !parser.poisoned
        },
        PoolConfiguration::new().with_max_pool_size(1),
    )
    .unwrap();

    {
        let mut parser = pool.acquire().unwrap();
        parser.scratch.extend_from_slice(b"half-parsed input");
        parser.poisoned = true;
    }
    println!("   Poisoned parser discarded, size {:?}", pool.current_size());

    let fresh = pool.acquire().unwrap();
    println!("   Fresh parser {} built in its place\n", fresh.id);
}

fn timed_pool() {
    println!("3. Blocking With Timeout:");
    let config = PoolConfiguration::new()
        .with_max_pool_size(1)
        .with_timeout(Duration::from_millis(100));
    let pool = BoundedPool::new(parser_factory(), config).unwrap();

    let held = pool.acquire().unwrap();
    match pool.acquire() {
        Err(e) => println!("   While held: {}", e),
        Ok(p) => println!("   Unexpectedly got parser {}", p.id),
    }

    let waiter = {
        let pool = pool.clone();
        thread::spawn(move || pool.acquire().map(|p| p.id))
    };
    thread::sleep(Duration::from_millis(20));
    drop(held);
    println!("   Waiter got parser {:?}\n", waiter.join().unwrap());
}

fn cancelled_wait() {
    println!("4. Cancellation:");
    let pool = BoundedPool::new(
        parser_factory(),
        PoolConfiguration::new().with_max_pool_size(1).blocking(),
    )
    .unwrap();
    let _held = pool.acquire().unwrap();

    let token = CancelToken::new();
    let waiter = {
        let pool = pool.clone();
        let options = AcquireOptions::new().with_cancel(token.clone());
        thread::spawn(move || pool.acquire_with(options).map(|p| p.id))
    };
    thread::sleep(Duration::from_millis(20));
    token.cancel();
    println!("   Waiter: {:?}, token cancelled: {}\n", waiter.join().unwrap(), token.is_cancelled());
}

fn metrics_and_health() {
    println!("5. Metrics and Health:");
    let pool = BoundedPool::new(
        parser_factory(),
        PoolConfiguration::new().with_max_pool_size(5).with_warmup(2),
    )
    .unwrap();

    {
        let _p1 = pool.acquire().unwrap();
        let _p2 = pool.acquire().unwrap();

        let health = pool.get_health_status();
        println!("   Health: {}", if health.is_healthy { "Healthy" } else { "Unhealthy" });
        println!("   Utilization: {:.1}%", health.utilization * 100.0);
        println!("   In use: {}, Idle: {}", health.in_use_objects, health.idle_objects);
    }

    let metrics = pool.export_metrics();
    println!("\n   Metrics:");
    for (key, value) in metrics {
        println!("     {}: {}", key, value);
    }
}
