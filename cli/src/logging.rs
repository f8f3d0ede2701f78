use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// Output goes to stderr so `--json` and `--csv` stay machine-readable.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}
