//! Log output for the `stacks` binary
//!
//! Library code emits `tracing` events; this installs the subscriber that
//! writes them to stderr. `RUST_LOG` wins when set, otherwise `--verbose`
//! selects debug and `STACKS_LOG_LEVEL` (default `info`) applies.

use std::env;
use std::io::IsTerminal;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fallback log level variable
pub const LOG_LEVEL_ENV: &str = "STACKS_LOG_LEVEL";

static INIT: Once = Once::new();

/// Installs the global subscriber (once)
pub fn init(verbose: bool) {
    INIT.call_once(|| {
        let level = if verbose {
            Level::DEBUG
        } else {
            env::var(LOG_LEVEL_ENV)
                .ok()
                .and_then(|value| parse_level(&value))
                .unwrap_or(Level::INFO)
        };

        let mut filter = EnvFilter::from_default_env();
        if env::var("RUST_LOG").is_err() {
            if let Ok(directive) = format!("stacks_cli={}", level).parse() {
                filter = filter.add_directive(directive);
            }
        }

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .without_time()
                    .with_ansi(std::io::stderr().is_terminal())
                    .with_writer(std::io::stderr),
            )
            .init();
    });
}

fn parse_level(value: &str) -> Option<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        other => {
            eprintln!(
                "Invalid log level '{}', defaulting to info. Valid levels: trace, debug, info, warn, error",
                other
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("loud"), None);
    }
}
