use tracing_subscriber::EnvFilter;

/// Installs a test writer subscriber, `RUST_LOG=latebind_di=debug` shows container activity
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
