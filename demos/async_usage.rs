//! Async usage examples

use bounded_pool::{AcquireOptions, BoundedPool, CancelToken, PoolConfiguration};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::main]
async fn main() {
    println!("=== bounded_pool - Async Examples ===\n");

    // Example 1: Async acquire
    async_acquire().await;

    // Example 2: Async with timeout
    async_with_timeout().await;

    // Example 3: Cancelling from a select
    async_cancel().await;

    // Example 4: Concurrent access
    concurrent_access().await;
}

fn buffer_pool(config: PoolConfiguration) -> BoundedPool<Vec<u8>> {
    BoundedPool::with_resetter(
        || Ok::<_, std::io::Error>(Vec::with_capacity(8192)),
        |buf: &mut Vec<u8>| {
            buf.clear();
            true
        },
        config,
    )
    .unwrap()
}

async fn async_acquire() {
    println!("1. Async Acquire:");
    let pool = buffer_pool(PoolConfiguration::default());

    {
        let buf = pool.acquire_async().await.unwrap();
        println!("   Got buffer asynchronously, capacity {}", buf.capacity());
    }

    println!();
}

async fn async_with_timeout() {
    println!("2. Async with Timeout:");

    let config = PoolConfiguration::new()
        .with_max_pool_size(1)
        .with_timeout(Duration::from_millis(100));
    let pool = buffer_pool(config);

    // Hold the only buffer
    let _buf = pool.acquire().unwrap();

    match pool.acquire_async().await {
        Ok(_) => println!("   Got buffer"),
        Err(e) => println!("   Error: {}", e),
    }

    println!();
}

async fn async_cancel() {
    println!("3. Cancellation:");
    let pool = buffer_pool(PoolConfiguration::new().with_max_pool_size(1).blocking());
    let _buf = pool.acquire().unwrap();

    let token = CancelToken::new();
    let options = AcquireOptions::new().with_cancel(token.clone());

    tokio::select! {
        result = pool.acquire_async_with(options) => {
            println!("   Finished: {:?}", result.map(|b| b.len()));
        }
        _ = sleep(Duration::from_millis(50)) => {
            token.cancel();
            println!("   Gave up waiting, token cancelled: {}", token.is_cancelled());
        }
    }

    println!();
}

async fn concurrent_access() {
    println!("4. Concurrent Access:");
    let pool = buffer_pool(PoolConfiguration::new().with_max_pool_size(3).blocking());

    let mut handles = vec![];
    for i in 0..10 {
        let pool = pool.clone();
        let handle = tokio::spawn(async move {
            let mut buf = pool.acquire_async().await.unwrap();
            buf.extend_from_slice(format!("task {}", i).as_bytes());
            sleep(Duration::from_millis(10)).await;
            buf.len()
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.await.unwrap();
    }

    println!("   All tasks completed, size {:?}", pool.current_size());
    println!("   Metrics: {:?}", pool.get_metrics());
}
