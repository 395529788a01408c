use std::sync::Arc;

use token_pool::Pool;
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    helpers::init_logging();

    let pool = Arc::new(Pool::new(1, 1, Duration::from_secs(1)));
    pool.drain();

    let start = Instant::now();
    let acquired = pool.acquire_timeout(Duration::from_millis(200)).await;
    println!("timed out acquire: {acquired} after {:?}", start.elapsed());

    let cancel = CancellationToken::new();

    let waiter = tokio::spawn({
        let pool = pool.clone();
        let cancel = cancel.clone();
        async move { pool.acquire(cancel.cancelled()).await }
    });

    time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    let acquired = waiter.await.expect("waiter panicked");
    println!("cancelled acquire: {acquired}");

    // The next refill is still there since nobody took it.
    let acquired = pool.acquire_timeout(Duration::from_secs(2)).await;
    println!("acquire after refill: {acquired} after {:?}", start.elapsed());
}
