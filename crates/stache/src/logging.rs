//! Log subscriber setup.
//!
//! Events go to stderr so rendered output on stdout stays clean.

use anyhow::{anyhow, Context as _, Result};
use tracing_subscriber::filter::EnvFilter;

/// Filter directive for a `-v` count.
pub fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    }
}

/// Builds the filter: an explicit directive wins over the verbosity count.
pub fn filter(verbose: u8, directive: Option<&str>) -> Result<EnvFilter> {
    match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log directive `{}`", directive)),
        None => Ok(EnvFilter::new(verbosity_directive(verbose))),
    }
}

/// Installs the global subscriber.
pub fn init(verbose: u8, directive: Option<&str>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(verbose, directive)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("failed to install log subscriber: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_directive(0), "warn");
        assert_eq!(verbosity_directive(1), "debug");
        assert_eq!(verbosity_directive(5), "trace");
    }

    #[test]
    fn test_directive_overrides_verbosity() {
        let filter = filter(0, Some("stache_render=trace")).unwrap();
        assert!(filter.to_string().contains("stache_render=trace"));
    }

    #[test]
    fn test_bad_directive_is_rejected() {
        assert!(filter(0, Some("stache_render=loud")).is_err());
    }
}
