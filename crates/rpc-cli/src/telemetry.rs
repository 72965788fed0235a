//! Logging bootstrap for the binaries.

use anyhow::{bail, Context, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Environment variable selecting log verbosity.
///
/// Accepts one of `trace`, `debug`, `info`, `warn`, `error`
/// (case-insensitive).
pub const LOG_ENV_VAR: &str = "RPC_LOG";

const DEFAULT_LEVEL: Level = Level::INFO;

/// Install the global tracing subscriber.
///
/// An unset variable means `info`; a set but invalid one is a startup error
/// rather than a silent fallback, so a typo in a service's environment never
/// runs it with the wrong verbosity.
pub fn init_logging() -> Result<()> {
    let level = match std::env::var(LOG_ENV_VAR) {
        Ok(value) => parse_level(&value)?,
        Err(std::env::VarError::NotPresent) => DEFAULT_LEVEL,
        Err(e) => bail!("could not read {LOG_ENV_VAR}: {e}"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.to_string()))
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install tracing subscriber")
}

/// Parse a verbosity level, rejecting anything that is not a level name.
///
/// `EnvFilter` cannot do this check: it treats an unknown word as a target
/// filter and accepts it, which turns a typo into a silently wrong
/// verbosity instead of a startup error.
fn parse_level(value: &str) -> Result<Level> {
    match Level::from_str(value) {
        Ok(level) => Ok(level),
        Err(_) => bail!(
            "invalid {LOG_ENV_VAR} value '{value}': expected one of trace, debug, info, warn, error"
        ),
    }
}
