//! Tracing subscriber setup for binaries embedding the store

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::constants::env;

/// Parse a log level name; unknown names fall back to `info`
pub fn parse_level(name: &str) -> Level {
    match name.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install a global fmt subscriber.
/// Level comes from `LOG_LEVEL` unless `verbose` forces debug output.
pub fn init(verbose: bool) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let level = if verbose {
        Level::DEBUG
    } else {
        std::env::var(env::LOG_LEVEL)
            .map(|v| parse_level(&v))
            .unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
