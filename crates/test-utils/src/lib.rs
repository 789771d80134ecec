pub mod builders;

use std::path::Path;
use std::sync::Once;

use buildshell::ShellContext;
use tracing_subscriber::{EnvFilter, fmt};

use crate::builders::EngineConfigBuilder;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Context whose log sinks live under `log_dir`, with a small pool.
pub fn test_context(log_dir: &Path, pool_size: usize) -> ShellContext {
    ShellContext::new(
        EngineConfigBuilder::new()
            .log_dir(log_dir)
            .pool_size(pool_size)
            .build(),
    )
}

/// Run a future with a 10-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// True when `program` can be found on PATH.
pub fn has_binary(program: &str) -> bool {
    buildshell::exec::preflight::resolve_program(
        program,
        None,
        std::env::var_os("PATH").as_deref(),
    )
    .is_some()
}
