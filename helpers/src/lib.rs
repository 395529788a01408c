/// Initialize logging for a given demo.
///
/// Filtering is controlled through `RUST_LOG`, so run with
/// `RUST_LOG=token_pool=trace` and the `tracing` feature enabled to see what
/// the pool is doing.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .compact(),
        )
        .init();
}
