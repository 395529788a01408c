use token_pool::Pool;
use tokio::time::{self, Duration, Instant};

#[tokio::main]
async fn main() {
    helpers::init_logging();

    let pool = Pool::new(10, 10, Duration::from_millis(250));
    let start = Instant::now();

    println!("Taking 25 tokens...");

    // The first 10 are instant, the remaining ones need two refills.
    for n in 0..25 {
        pool.token().await;
        println!("token {n} at {:?}", start.elapsed());
    }

    pool.drain();
    println!("Drained, {} tokens left", pool.num_tokens());

    time::sleep(Duration::from_millis(300)).await;
    println!("After a refill, {} tokens", pool.num_tokens());

    pool.close();
}
