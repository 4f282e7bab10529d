//! Subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

use crate::error::{ObliqueError, Result};

/// Install a stderr fmt subscriber. `RUST_LOG`, when set, overrides `default_level`.
pub fn init(default_level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_level)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| ObliqueError::Config(format!("logging already initialised: {}", e)))
}

fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| ObliqueError::Config(format!("invalid log level '{}': {}", directives, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_levels_and_directives() {
        assert!(parse_filter("info").is_ok());
        assert!(parse_filter("oblique=debug,wgpu_core=warn").is_ok());
    }
}
