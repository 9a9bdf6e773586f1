use tracing_subscriber::{fmt, EnvFilter};

/// Installs the global subscriber. Output goes to stderr; stdout carries the
/// IPC protocol.
///
/// `RUST_LOG` controls the filter (default `warn`), e.g.
/// `RUST_LOG=gradingd=debug`.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
