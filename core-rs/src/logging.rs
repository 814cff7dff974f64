//! Structured logging setup
//!
//! Log records go to stderr so stdout stays clean for generated output and
//! progress lines. `RUST_LOG` takes precedence over the command line level.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Logging options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for this crate's targets
    pub level: Level,
    /// Include the module target in each line
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            include_target: true,
        }
    }
}

impl LoggingConfig {
    /// Level from the `--verbose` / `--quiet` flags
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        let level = if verbose {
            Level::DEBUG
        } else if quiet {
            Level::WARN
        } else {
            Level::INFO
        };
        Self {
            level,
            ..Default::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        if env::var("RUST_LOG").is_ok() {
            return EnvFilter::from_default_env();
        }
        EnvFilter::new(format!("warn,fastocloud_env={},reqwest=warn", self.level))
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let layer = fmt::layer()
            .with_target(config.include_target)
            .with_writer(std::io::stderr);

        // A subscriber installed elsewhere (tests) wins.
        let _ = tracing_subscriber::registry()
            .with(config.filter())
            .with(layer)
            .try_init();
    });
}
