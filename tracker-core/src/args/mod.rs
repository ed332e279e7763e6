//! Defines the command-line arguments shared by every tracker command.
//!
//! Each value can also be supplied through a `TRACKER_*` environment variable, the
//! command line taking precedence. The parsed values are validated once and then
//! handed explicitly to the components that need them.

use crate::position::{BuilderConfig, DEFAULT_BUCKET_WIDTH_SECS};
use clap::Parser;
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgsError {
    #[error("unknown environment {0:?}, expected one of: local, test, dev, prod")]
    UnknownEnvironment(String),
    #[error("database path must not be empty")]
    EmptyDatabase,
}

/// Deployment environment the tracker runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Local,
    Test,
    Dev,
    Prod,
}

impl FromStr for Environment {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" => Ok(Environment::Local),
            "test" => Ok(Environment::Test),
            "dev" | "development" => Ok(Environment::Dev),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(ArgsError::UnknownEnvironment(s.to_string())),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Local => "local",
            Environment::Test => "test",
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        };
        f.write_str(name)
    }
}

/// Holds the standard configuration parameters parsed from the command line.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct CommonArgs {
    /// Current environment, one of: local, test, dev, prod
    #[arg(long, env = "TRACKER_ENV", default_value = "local")]
    env: Environment,

    /// Log level, one of: off, error, warn, info, debug, trace
    #[arg(long, env = "TRACKER_LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,

    /// Path to the SQLite database holding trades and positions
    #[arg(long, env = "TRACKER_DATABASE", default_value = "tradetracker.db")]
    database: PathBuf,

    /// Width of a position bucket in seconds, 0 emits a position per trade
    #[arg(long, env = "TRACKER_BUCKET_WIDTH", default_value_t = DEFAULT_BUCKET_WIDTH_SECS)]
    bucket_width: u64,
}

impl Default for CommonArgs {
    fn default() -> Self {
        Self {
            env: Environment::Local,
            log_level: LevelFilter::Info,
            database: PathBuf::from("tradetracker.db"),
            bucket_width: DEFAULT_BUCKET_WIDTH_SECS,
        }
    }
}

impl CommonArgs {
    /// Parses command-line arguments into a `CommonArgs` struct.
    ///
    /// `--help` and `--version` are handled by `clap`, which also exits on invalid
    /// arguments.
    pub fn parse_args(args: Vec<String>) -> Self {
        CommonArgs::parse_from(args)
    }

    /// Checks the values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), ArgsError> {
        if self.database.as_os_str().is_empty() {
            return Err(ArgsError::EmptyDatabase);
        }
        Ok(())
    }

    pub fn get_env(&self) -> Environment {
        self.env
    }

    pub fn get_log_level(&self) -> LevelFilter {
        self.log_level
    }

    /// Returns the path of the SQLite database.
    pub fn get_database(&self) -> PathBuf {
        self.database.clone()
    }

    pub fn get_bucket_width(&self) -> u64 {
        self.bucket_width
    }

    /// Returns a builder configuration with the configured bucket width and no initial
    /// position.
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig::new(self.bucket_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CommonArgs {
        let mut argv = vec!["tradetracker".to_string()];
        argv.extend(args.iter().map(|s| s.to_string()));
        CommonArgs::parse_args(argv)
    }

    #[test]
    fn test_explicit_flags() {
        let args = parse(&[
            "--env",
            "production",
            "--log-level",
            "debug",
            "--database",
            "/tmp/trades.db",
            "--bucket-width",
            "0",
        ]);
        assert_eq!(args.get_env(), Environment::Prod);
        assert_eq!(args.get_log_level(), LevelFilter::Debug);
        assert_eq!(args.get_database(), PathBuf::from("/tmp/trades.db"));
        assert_eq!(args.builder_config().get_bucket_width_secs(), 0);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_environment_names() {
        assert_eq!("local".parse(), Ok(Environment::Local));
        assert_eq!("TEST".parse(), Ok(Environment::Test));
        assert_eq!("development".parse(), Ok(Environment::Dev));
        assert_eq!(" dev ".parse(), Ok(Environment::Dev));
        assert_eq!(
            "staging".parse::<Environment>(),
            Err(ArgsError::UnknownEnvironment("staging".to_string()))
        );
        assert_eq!(Environment::Prod.to_string(), "prod");
    }

    #[test]
    fn test_invalid_flags_rejected() {
        let argv = ["tradetracker", "--env", "staging"];
        assert!(CommonArgs::try_parse_from(argv).is_err());
        let argv = ["tradetracker", "--bucket-width", "-1"];
        assert!(CommonArgs::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_empty_database_rejected() {
        let args = CommonArgs {
            database: PathBuf::new(),
            ..CommonArgs::default()
        };
        assert_eq!(args.validate(), Err(ArgsError::EmptyDatabase));
    }

    #[test]
    fn test_default_matches_documented_values() {
        let args = CommonArgs::default();
        assert_eq!(args.get_env(), Environment::Local);
        assert_eq!(args.get_log_level(), LevelFilter::Info);
        assert_eq!(args.get_bucket_width(), 1);
        assert_eq!(args.get_database(), PathBuf::from("tradetracker.db"));
    }
}
