// src/logging.rs

//! Tracing setup for the `windag` binary.
//!
//! `--log-level` sets a single global level. Without it, `WINDAG_LOG` is read
//! as an `EnvFilter` directive string (`info`, `windag::exec=trace,warn`, ...)
//! and an unset or unparsable value falls back to `info`.
//!
//! Node lifecycle events, task process stdout (info) and stderr (debug) all
//! go through this subscriber on stderr.

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const ENV_LOG: &str = "WINDAG_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(ENV_LOG).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::default().add_directive(level_filter(level).into());
    }
    env.map(str::trim)
        .filter(|directives| !directives.is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::default().add_directive(LevelFilter::INFO.into()))
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn env_directives_are_used_when_valid() {
        let filter = build_filter(None, Some(" warn "));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));

        let filter = build_filter(None, Some("windag::exec=trace,warn"));
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }

    #[test]
    fn missing_or_bad_env_falls_back_to_info() {
        assert_eq!(build_filter(None, None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(build_filter(None, Some("")).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            build_filter(None, Some("windag=notalevel")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
