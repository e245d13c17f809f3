//! Logging settings.

use crate::{Error, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when none is configured.
const DEFAULT_FILTER: &str = "lockout=info";

/// Default filter in verbose mode.
const VERBOSE_FILTER: &str = "lockout=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name; anything other than `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging settings resolved from config and environment.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Output format.
    pub format: LogFormat,
    /// Filter directive, e.g. `lockout=debug,warn`.
    pub filter: Option<String>,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingSettings {
    /// Builds the configured filter, or the default for `verbose` when none
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the configured directive does not
    /// parse.
    pub fn env_filter(&self, verbose: bool) -> Result<EnvFilter> {
        let Some(directive) = self.filter.as_deref() else {
            return Ok(Self::default_filter(verbose));
        };
        EnvFilter::try_new(directive)
            .map_err(|e| Error::InvalidInput(format!("log filter '{directive}': {e}")))
    }

    /// Returns the filter used when none is configured.
    #[must_use]
    pub fn default_filter(verbose: bool) -> EnvFilter {
        EnvFilter::new(if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_invalid_filter_is_an_error() {
        let settings = LoggingSettings {
            filter: Some("lockout=notalevel".to_string()),
            ..Default::default()
        };
        let err = settings.env_filter(false).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(err.to_string().contains("notalevel"));
    }

    #[test]
    fn test_default_filter_follows_verbosity() {
        let settings = LoggingSettings::default();
        assert_eq!(settings.env_filter(false).unwrap().to_string(), DEFAULT_FILTER);
        assert_eq!(settings.env_filter(true).unwrap().to_string(), VERBOSE_FILTER);
    }
}
