//! Logging for the pipeline and the tools it forks.
//!
//! Everything goes to stderr so `--format json|yaml` output on stdout stays
//! machine-readable. Lines read from a child JVM are logged under the
//! `gwtpipe::tool` target, stdout at INFO and stderr at WARN.

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub const LEVEL_ENV: &str = "GWTPIPE_LOG_LEVEL";
pub const JSON_ENV: &str = "GWTPIPE_LOG_JSON";

/// Dependencies that are chatty at INFO and below
const QUIET_DEPENDENCIES: &str = "h2=warn,hyper=warn,reqwest=warn,rustls=warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    /// One JSON object per line instead of text
    pub json: bool,
    /// Print the target of each event, which tells pipeline lines from tool output
    pub show_targets: bool,
}

impl LoggingConfig {
    /// Level precedence: `--log-level`, `-v`, `-q`, then `GWTPIPE_LOG_LEVEL`.
    pub fn from_args(log_level: Option<&str>, verbose: bool, quiet: bool) -> Self {
        let level = match log_level {
            Some(explicit) => parse_level(explicit),
            None if verbose => Level::DEBUG,
            None if quiet => Level::ERROR,
            None => env::var(LEVEL_ENV)
                .map(|v| parse_level(&v))
                .unwrap_or(Level::INFO),
        };

        Self {
            level,
            json: env_flag(JSON_ENV),
            show_targets: verbose,
        }
    }

    /// `RUST_LOG` replaces the computed directives entirely when set.
    fn filter(&self) -> EnvFilter {
        match env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
            _ => EnvFilter::new(format!("gwtpipe={},{}", self.level, QUIET_DEPENDENCIES)),
        }
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(false)
}

/// Case-insensitive level name; anything unknown falls back to INFO.
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let json = config.json.then(|| {
            fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_target(config.show_targets)
        });
        let text = (!config.json).then(|| {
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(config.show_targets)
        });

        tracing_subscriber::registry()
            .with(config.filter())
            .with(json)
            .with(text)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" info "), Level::INFO);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("Error"), Level::ERROR);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    #[serial]
    fn test_explicit_level_beats_flags() {
        let config = LoggingConfig::from_args(Some("trace"), false, true);
        assert_eq!(config.level, Level::TRACE);
        assert!(!config.show_targets);
    }

    #[test]
    #[serial]
    fn test_verbose_and_quiet() {
        let verbose = LoggingConfig::from_args(None, true, false);
        assert_eq!(verbose.level, Level::DEBUG);
        assert!(verbose.show_targets);
        assert_eq!(LoggingConfig::from_args(None, false, true).level, Level::ERROR);
    }

    #[test]
    #[serial]
    fn test_level_and_json_from_env() {
        env::set_var(LEVEL_ENV, "warn");
        env::set_var(JSON_ENV, "true");
        let config = LoggingConfig::from_args(None, false, false);
        env::remove_var(LEVEL_ENV);
        env::remove_var(JSON_ENV);

        assert_eq!(config.level, Level::WARN);
        assert!(config.json);
    }

    #[test]
    #[serial]
    fn test_filter_caps_dependencies_unless_rust_log_set() {
        env::remove_var("RUST_LOG");
        let config = LoggingConfig::from_args(Some("debug"), false, false);
        let directives = config.filter().to_string();
        assert!(directives.contains("gwtpipe=debug"), "{}", directives);
        assert!(directives.contains("reqwest=warn"), "{}", directives);

        env::set_var("RUST_LOG", "gwtpipe::tool=trace");
        let directives = config.filter().to_string();
        env::remove_var("RUST_LOG");
        assert!(directives.contains("gwtpipe::tool=trace"), "{}", directives);
        assert!(!directives.contains("reqwest"), "{}", directives);
    }
}
