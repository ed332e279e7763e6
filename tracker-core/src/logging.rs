//! Process-wide logger setup.

use env_logger::Env;
use log::LevelFilter;

/// Initialises `env_logger` at `level`. `RUST_LOG`, when set, takes precedence.
///
/// Calling it more than once is harmless; only the first call installs the logger.
pub fn init(level: LevelFilter) {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(level.to_string()))
        .format_timestamp_millis()
        .try_init();
}
