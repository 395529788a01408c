use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::Context;

use token_pool::Pool;
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

struct Waker;

impl std::task::Wake for Waker {
    fn wake(self: Arc<Self>) {}
}

#[tokio::test(start_paused = true)]
async fn test_acquire_timeout() {
    let pool = Pool::new(1, 0, Duration::from_millis(25));
    assert!(pool.token().await);

    let start = Instant::now();
    assert!(!pool.acquire_timeout(Duration::from_millis(30)).await);

    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(30) && elapsed < Duration::from_millis(35),
        "elapsed: {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_acquire_until() {
    let pool = Pool::new(1, 0, Duration::from_millis(25));
    pool.drain();

    let deadline = Instant::now() + Duration::from_millis(40);
    assert!(!pool.acquire_until(deadline).await);
    assert!(Instant::now() >= deadline);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_before_deadline() {
    let pool = Pool::new(1, 1, Duration::from_millis(20));
    pool.drain();

    let start = Instant::now();
    assert!(pool.acquire_timeout(Duration::from_millis(100)).await);

    let elapsed = start.elapsed();
    assert!(
        elapsed >= Duration::from_millis(20) && elapsed < Duration::from_millis(25),
        "elapsed: {:?}",
        elapsed
    );
}

#[tokio::test(start_paused = true)]
async fn test_acquire_cancelled() {
    let pool = Pool::new(1, 0, Duration::from_millis(25));
    pool.drain();

    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();

        async move {
            time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        }
    });

    let start = Instant::now();
    assert!(!pool.acquire(cancel.cancelled()).await);
    assert!(start.elapsed() >= Duration::from_millis(10));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_acquire_keeps_token() {
    let pool = Pool::new(1, 1, Duration::from_millis(100));
    pool.drain();

    assert!(!pool.acquire_timeout(Duration::from_millis(30)).await);

    time::sleep(Duration::from_millis(80)).await;

    // The refill which happened after the cancellation is still there.
    assert_eq!(pool.num_tokens(), 1);
    assert!(pool.try_token());
}

#[tokio::test(start_paused = true)]
async fn test_ready_token_wins_over_cancellation() {
    let pool = Pool::new(2, 0, Duration::from_millis(25));

    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(pool.acquire(cancel.cancelled()).await);
    assert_eq!(pool.num_tokens(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_acquire_closed() {
    let pool = Pool::new(1, 0, Duration::from_millis(25));
    pool.drain();
    pool.close();

    let start = Instant::now();
    assert!(!pool.acquire_timeout(Duration::from_secs(1)).await);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_token_keeps_token() {
    let pool = Pool::new(1, 1, Duration::from_millis(50));
    pool.drain();

    let waker = Arc::new(Waker).into();
    let mut cx = Context::from_waker(&waker);

    {
        let mut token = pin!(pool.token());
        assert!(token.as_mut().poll(&mut cx).is_pending());

        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(pool.num_tokens(), 1);
    }

    // The parked future was dropped before it got to take the token.
    assert_eq!(pool.num_tokens(), 1);
    assert!(pool.try_token());
}

#[tokio::test(start_paused = true)]
async fn test_waiters_served_once() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let pool = Arc::new(Pool::new(5, 5, Duration::from_millis(50)));
    pool.drain();

    let served = Arc::new(AtomicUsize::new(0));
    let mut tasks = Vec::new();

    for _ in 0..12 {
        let pool = pool.clone();
        let served = served.clone();

        tasks.push(tokio::spawn(async move {
            assert!(pool.token().await);
            served.fetch_add(1, Ordering::SeqCst);
        }));
    }

    time::sleep(Duration::from_millis(60)).await;
    assert_eq!(served.load(Ordering::SeqCst), 5);
    assert_eq!(pool.num_tokens(), 0);

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(served.load(Ordering::SeqCst), 10);
    assert_eq!(pool.num_tokens(), 0);

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(served.load(Ordering::SeqCst), 12);
    assert_eq!(pool.num_tokens(), 3);

    for task in tasks {
        task.await.unwrap();
    }
}
