use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use token_pool::Pool;

fn main() -> anyhow::Result<()> {
    helpers::init_logging();

    let runtime = tokio::runtime::Runtime::new()?;

    let pool = {
        let _guard = runtime.enter();
        Arc::new(Pool::new(4, 2, Duration::from_millis(100)))
    };

    let start = Instant::now();
    let mut threads = Vec::new();

    for n in 0..4 {
        let pool = pool.clone();

        threads.push(thread::spawn(move || {
            for i in 0..3 {
                pool.blocking_token();
                println!("thread {n} token {i} at {:?}", start.elapsed());
            }
        }));
    }

    for thread in threads {
        thread.join().expect("thread panicked");
    }

    pool.close();
    Ok(())
}
