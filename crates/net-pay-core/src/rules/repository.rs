//! Rule document repository.
//!
//! Fetches one JSON document per country from the configured source and
//! keeps it for the lifetime of the repository. Entries are written once and
//! never replaced; a fresh repository is needed to pick up document changes.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::{Diagnostics, EngineConfig, RuleSource};
use crate::error::{RuleError, RuleNotFoundCause, TaxClassCause};
use crate::rules::document::CountryRuleDocument;
use crate::rules::lint::lint_document;

/// Country code -> document file name.
pub const RULE_FILES: &[(&str, &str)] = &[
    ("AT", "austria.json"),
    ("DE", "germany.json"),
    ("ES", "spain.json"),
    ("FR", "france.json"),
    ("GB", "united-kingdom.json"),
    ("NL", "netherlands.json"),
    ("SE", "sweden.json"),
];

/// Uppercase, trimmed, with `UK` folded into `GB`.
pub fn normalize_country_code(code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    if code == "UK" {
        "GB".to_string()
    } else {
        code
    }
}

pub fn rule_file_for(country_code: &str) -> Option<&'static str> {
    let code = normalize_country_code(country_code);
    RULE_FILES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, file)| *file)
}

pub fn supported_countries() -> Vec<&'static str> {
    RULE_FILES.iter().map(|(c, _)| *c).collect()
}

pub struct RuleRepository {
    source: RuleSource,
    diagnostics: Diagnostics,
    #[cfg(feature = "http")]
    http: reqwest::Client,
    cache: RwLock<HashMap<String, Arc<CountryRuleDocument>>>,
}

impl std::fmt::Debug for RuleRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRepository")
            .field("source", &self.source)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl RuleRepository {
    /// Repository without load-time linting.
    pub fn new(source: RuleSource) -> Self {
        Self {
            source,
            diagnostics: Diagnostics::Off,
            #[cfg(feature = "http")]
            http: reqwest::Client::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.source.clone()).with_diagnostics(config.diagnostics)
    }

    /// Lint tax classes when a document is first loaded.
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn source(&self) -> &RuleSource {
        &self.source
    }

    /// Load a country's document, fetching it on first use.
    pub async fn load(&self, country_code: &str) -> Result<Arc<CountryRuleDocument>, RuleError> {
        let code = normalize_country_code(country_code);
        let file = rule_file_for(&code)
            .ok_or_else(|| RuleError::not_found(&code, RuleNotFoundCause::UnsupportedCountry))?;

        if let Some(doc) = self.cache.read().await.get(&code) {
            tracing::debug!(country = %code, "rule document cache hit");
            return Ok(Arc::clone(doc));
        }

        tracing::debug!(country = %code, file, "fetching rule document");
        let bytes = self.fetch(&code, file).await?;
        let document = Self::parse_document(&code, &bytes)?;
        self.lint_on_load(&document)?;

        let mut cache = self.cache.write().await;
        let entry = cache
            .entry(code.clone())
            .or_insert_with(|| Arc::new(document));
        tracing::info!(
            country = %code,
            years = entry.years.len(),
            "rule document loaded"
        );
        Ok(Arc::clone(entry))
    }

    /// Country codes currently held in the cache.
    pub async fn cached_countries(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.cache.read().await.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Parse and validate raw document bytes.
    ///
    /// The document must be a JSON object with a `years` object. A missing
    /// `countryCode` is filled in with `country_code`.
    pub fn parse_document(country_code: &str, bytes: &[u8]) -> Result<CountryRuleDocument, RuleError> {
        let code = normalize_country_code(country_code);
        let raw: Value = serde_json::from_slice(bytes)
            .map_err(|e| RuleError::not_found_because(&code, RuleNotFoundCause::InvalidJson, e))?;

        if !raw.get("years").map(Value::is_object).unwrap_or(false) {
            return Err(RuleError::not_found(&code, RuleNotFoundCause::MissingYears));
        }

        let mut document: CountryRuleDocument = serde_json::from_value(raw)
            .map_err(|e| RuleError::not_found_because(&code, RuleNotFoundCause::InvalidJson, e))?;
        if document.country_code.trim().is_empty() {
            document.country_code = code;
        } else {
            document.country_code = normalize_country_code(&document.country_code);
        }
        Ok(document)
    }

    fn lint_on_load(&self, document: &CountryRuleDocument) -> Result<(), RuleError> {
        if self.diagnostics == Diagnostics::Off {
            return Ok(());
        }
        for diagnostic in lint_document(document)? {
            if self.diagnostics == Diagnostics::Strict {
                return Err(RuleError::InvalidTaxClass {
                    country_code: diagnostic.country_code,
                    year: diagnostic.year.parse().unwrap_or_default(),
                    tax_class: Some(diagnostic.tax_class),
                    cause: TaxClassCause::NoEffect,
                });
            }
            tracing::warn!(
                country = %diagnostic.country_code,
                year = %diagnostic.year,
                tax_class = %diagnostic.tax_class,
                "{}",
                diagnostic.message
            );
        }
        Ok(())
    }

    async fn fetch(&self, code: &str, file: &str) -> Result<Vec<u8>, RuleError> {
        match &self.source {
            #[cfg(feature = "http")]
            RuleSource::Http { base_url } => {
                let url = format!("{}/{}", base_url.as_str().trim_end_matches('/'), file);
                let resp = self.http.get(&url).send().await.map_err(|e| {
                    RuleError::not_found_because(code, RuleNotFoundCause::Network, e)
                })?;

                if !resp.status().is_success() {
                    return Err(RuleError::RuleNotFound {
                        country_code: code.to_string(),
                        cause: RuleNotFoundCause::Http,
                        status: Some(resp.status().as_u16()),
                        reason: Some(url),
                    });
                }

                let bytes = resp.bytes().await.map_err(|e| {
                    RuleError::not_found_because(code, RuleNotFoundCause::Network, e)
                })?;
                Ok(bytes.to_vec())
            }
            RuleSource::Directory(dir) => read_file(code, &dir.join(file)).await,
        }
    }
}

async fn read_file(code: &str, path: &Path) -> Result<Vec<u8>, RuleError> {
    tokio::fs::read(path).await.map_err(|e| {
        RuleError::not_found_because(code, RuleNotFoundCause::Io, format!("{}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_country_code() {
        assert_eq!(normalize_country_code(" de "), "DE");
        assert_eq!(normalize_country_code("uk"), "GB");
    }

    #[test]
    fn test_rule_file_lookup() {
        assert_eq!(rule_file_for("at"), Some("austria.json"));
        assert_eq!(rule_file_for("UK"), Some("united-kingdom.json"));
        assert_eq!(rule_file_for("XX"), None);
    }

    #[test]
    fn test_parse_rejects_missing_years() {
        let err = RuleRepository::parse_document("de", br#"{"name": "Germany"}"#).unwrap_err();
        match err {
            RuleError::RuleNotFound { cause, country_code, .. } => {
                assert_eq!(cause, RuleNotFoundCause::MissingYears);
                assert_eq!(country_code, "DE");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = RuleRepository::parse_document("DE", b"{not json").unwrap_err();
        assert!(matches!(
            err,
            RuleError::RuleNotFound {
                cause: RuleNotFoundCause::InvalidJson,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_fills_country_code() {
        let doc = RuleRepository::parse_document(
            "at",
            br#"{"name": "Austria", "currency": "EUR", "years": {}}"#,
        )
        .unwrap();
        assert_eq!(doc.country_code, "AT");
    }

    #[tokio::test]
    async fn test_unknown_country_fails_before_fetch() {
        let repo = RuleRepository::new(RuleSource::Directory("does-not-exist".into()));
        let err = repo.load("xx").await.unwrap_err();
        assert!(matches!(
            err,
            RuleError::RuleNotFound {
                cause: RuleNotFoundCause::UnsupportedCountry,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_cause() {
        let repo = RuleRepository::new(RuleSource::Directory("does-not-exist".into()));
        let err = repo.load("de").await.unwrap_err();
        assert!(matches!(
            err,
            RuleError::RuleNotFound {
                cause: RuleNotFoundCause::Io,
                ..
            }
        ));
        assert!(repo.cached_countries().await.is_empty());
    }
}
