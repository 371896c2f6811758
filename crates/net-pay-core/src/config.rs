//! Engine configuration.
//!
//! Selects where rule documents come from and how strictly tax-class
//! diagnostics are enforced. Defaults read the `rules/` directory next to
//! the working directory. Override via environment variables or explicit
//! construction.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
#[cfg(feature = "http")]
use url::Url;

/// Default directory holding the shipped rule documents.
pub const DEFAULT_RULES_DIR: &str = "rules";

/// Handling of tax classes whose override leaves the income tax unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diagnostics {
    Off,
    #[default]
    Warn,
    Strict,
}

impl FromStr for Diagnostics {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Diagnostics::Off),
            "warn" => Ok(Diagnostics::Warn),
            "strict" => Ok(Diagnostics::Strict),
            other => Err(ConfigError::InvalidDiagnostics(other.to_string())),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Diagnostics::Off => "off",
            Diagnostics::Warn => "warn",
            Diagnostics::Strict => "strict",
        })
    }
}

/// Where rule documents are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    /// `GET {base_url}/{file}` for each country.
    #[cfg(feature = "http")]
    Http { base_url: Url },
    /// `{dir}/{file}` on the local filesystem.
    Directory(PathBuf),
}

impl Default for RuleSource {
    fn default() -> Self {
        RuleSource::Directory(PathBuf::from(DEFAULT_RULES_DIR))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub source: RuleSource,
    pub diagnostics: Diagnostics,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `NETPAY_RULES_URL` (http base url; wins over the directory)
    /// - `NETPAY_RULES_DIR` (default: `rules`)
    /// - `NETPAY_DIAGNOSTICS` (`off`, `warn` or `strict`; default: `warn`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let diagnostics = match std::env::var("NETPAY_DIAGNOSTICS") {
            Ok(raw) => raw.parse()?,
            Err(_) => Diagnostics::default(),
        };

        #[cfg(feature = "http")]
        if let Ok(raw) = std::env::var("NETPAY_RULES_URL") {
            let base_url = Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl {
                var: "NETPAY_RULES_URL".into(),
                reason: e.to_string(),
            })?;
            return Ok(Self {
                source: RuleSource::Http { base_url },
                diagnostics,
            });
        }

        let dir = std::env::var("NETPAY_RULES_DIR").unwrap_or_else(|_| DEFAULT_RULES_DIR.into());
        Ok(Self {
            source: RuleSource::Directory(PathBuf::from(dir)),
            diagnostics,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL in {var}: {reason}")]
    InvalidUrl { var: String, reason: String },

    #[error("invalid diagnostics mode '{0}' (expected off, warn or strict)")]
    InvalidDiagnostics(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_parse() {
        assert_eq!("STRICT".parse::<Diagnostics>().unwrap(), Diagnostics::Strict);
        assert_eq!(" off ".parse::<Diagnostics>().unwrap(), Diagnostics::Off);
        assert!("loud".parse::<Diagnostics>().is_err());
    }

    #[test]
    fn test_default_source_is_rules_directory() {
        let config = EngineConfig::default();
        assert_eq!(config.source, RuleSource::Directory(PathBuf::from("rules")));
        assert_eq!(config.diagnostics, Diagnostics::Warn);
    }
}
