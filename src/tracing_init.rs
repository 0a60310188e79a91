use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Log filter is read from `PRIVACY_DASH_LOG` (e.g. `debug`,
/// `privacy_dash=trace`); warnings only by default. Output goes to stderr so
/// `--json` stdout stays parseable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("PRIVACY_DASH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry().with(filter).with(layer).init()
}
