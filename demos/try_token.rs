use token_pool::Pool;
use tokio::time::Duration;

#[tokio::main]
async fn main() {
    helpers::init_logging();

    let pool = Pool::new(3, 1, Duration::from_secs(1));

    for n in 0..5 {
        println!("try_token {n}: {}", pool.try_token());
    }
}
