use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

/// Why a rule document could not be produced for a country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleNotFoundCause {
    UnsupportedCountry,
    Network,
    Http,
    Io,
    InvalidJson,
    MissingYears,
}

impl fmt::Display for RuleNotFoundCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleNotFoundCause::UnsupportedCountry => "unsupported_country",
            RuleNotFoundCause::Network => "network",
            RuleNotFoundCause::Http => "http",
            RuleNotFoundCause::Io => "io",
            RuleNotFoundCause::InvalidJson => "invalid_json",
            RuleNotFoundCause::MissingYears => "missing_years",
        };
        f.write_str(s)
    }
}

/// Why a tax-class selector was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxClassCause {
    MissingRequired,
    Unknown,
    NoEffect,
}

impl fmt::Display for TaxClassCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaxClassCause::MissingRequired => "missing_required",
            TaxClassCause::Unknown => "unknown",
            TaxClassCause::NoEffect => "no_effect",
        };
        f.write_str(s)
    }
}

/// Failures while loading documents or resolving a tax context.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("No rule document for '{country_code}' ({cause})")]
    RuleNotFound {
        country_code: String,
        cause: RuleNotFoundCause,
        status: Option<u16>,
        reason: Option<String>,
    },

    #[error("No rules for {country_code} in year {year}")]
    YearRulesNotFound { country_code: String, year: i32 },

    #[error("Invalid tax class {tax_class:?} for {country_code}/{year} ({cause})")]
    InvalidTaxClass {
        country_code: String,
        year: i32,
        tax_class: Option<String>,
        cause: TaxClassCause,
    },

    #[error("No region selected for {country_code}/{year} and the document has no default region")]
    NoRegionSelected { country_code: String, year: i32 },

    #[error("Unknown region '{region}' for {country_code}/{year}")]
    UnknownRegion {
        country_code: String,
        year: i32,
        region: String,
    },

    #[error("Invalid rule document for {country_code}: {reason}")]
    InvalidRuleDocument { country_code: String, reason: String },
}

impl RuleError {
    pub(crate) fn not_found(country_code: &str, cause: RuleNotFoundCause) -> Self {
        RuleError::RuleNotFound {
            country_code: country_code.to_string(),
            cause,
            status: None,
            reason: None,
        }
    }

    pub(crate) fn not_found_because(
        country_code: &str,
        cause: RuleNotFoundCause,
        reason: impl fmt::Display,
    ) -> Self {
        RuleError::RuleNotFound {
            country_code: country_code.to_string(),
            cause,
            status: None,
            reason: Some(reason.to_string()),
        }
    }

    /// Translatable key identifying the failure.
    pub fn category(&self) -> &'static str {
        match self {
            RuleError::RuleNotFound { .. } => "error.rule_not_found",
            RuleError::YearRulesNotFound { .. } => "error.year_rules_not_found",
            RuleError::InvalidTaxClass { .. } => "error.invalid_tax_class",
            RuleError::NoRegionSelected { .. } => "error.no_region_selected",
            RuleError::UnknownRegion { .. } => "error.unknown_region",
            RuleError::InvalidRuleDocument { .. } => "error.invalid_rule_document",
        }
    }

    /// Structured payload for diagnostic logging.
    pub fn details(&self) -> Value {
        match self {
            RuleError::RuleNotFound {
                country_code,
                cause,
                status,
                reason,
            } => json!({
                "countryCode": country_code,
                "cause": cause,
                "status": status,
                "reason": reason,
            }),
            RuleError::YearRulesNotFound { country_code, year }
            | RuleError::NoRegionSelected { country_code, year } => json!({
                "countryCode": country_code,
                "year": year,
            }),
            RuleError::InvalidTaxClass {
                country_code,
                year,
                tax_class,
                cause,
            } => json!({
                "countryCode": country_code,
                "year": year,
                "taxClass": tax_class,
                "cause": cause,
            }),
            RuleError::UnknownRegion {
                country_code,
                year,
                region,
            } => json!({
                "countryCode": country_code,
                "year": year,
                "region": region,
            }),
            RuleError::InvalidRuleDocument {
                country_code,
                reason,
            } => json!({
                "countryCode": country_code,
                "reason": reason,
            }),
        }
    }
}

/// Failures inside the numeric pipeline.
#[derive(Debug, Error)]
pub enum ComputationError {
    #[error("No tax context supplied")]
    MissingTaxContext,

    #[error("Calculation mode {calc_mode} does not match context {context}")]
    CalcModeMismatch { context: String, calc_mode: String },

    #[error("A tax class is required for {country_code}/{year}")]
    MissingTaxClass { country_code: String, year: i32 },

    #[error("No income tax rules for {country_code}/{year}")]
    MissingIncomeTaxRules { country_code: String, year: i32 },

    #[error("Formula {method:?} is missing or not registered")]
    FormulaMissing { method: Option<String> },

    #[error("Formula '{method}' failed: {reason}")]
    FormulaExecution { method: String, reason: String },

    #[error("Formula '{method}' returned an invalid amount: {value}")]
    FormulaInvalidResult { method: String, value: Decimal },

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },
}

impl ComputationError {
    pub fn category(&self) -> &'static str {
        match self {
            ComputationError::MissingTaxContext => "error.missing_tax_context",
            ComputationError::CalcModeMismatch { .. } => "error.calc_mode_mismatch",
            ComputationError::MissingTaxClass { .. } => "error.missing_tax_class",
            ComputationError::MissingIncomeTaxRules { .. } => "error.missing_income_tax_rules",
            ComputationError::FormulaMissing { .. } => "error.formula_missing",
            ComputationError::FormulaExecution { .. } => "error.formula_execution",
            ComputationError::FormulaInvalidResult { .. } => "error.formula_invalid_result",
            ComputationError::InvalidInput { .. } => "error.invalid_input",
        }
    }

    pub fn details(&self) -> Value {
        match self {
            ComputationError::MissingTaxContext => json!({}),
            ComputationError::CalcModeMismatch { context, calc_mode } => json!({
                "context": context,
                "calcMode": calc_mode,
            }),
            ComputationError::MissingTaxClass { country_code, year }
            | ComputationError::MissingIncomeTaxRules { country_code, year } => json!({
                "countryCode": country_code,
                "year": year,
            }),
            ComputationError::FormulaMissing { method } => json!({ "method": method }),
            ComputationError::FormulaExecution { method, reason } => json!({
                "method": method,
                "reason": reason,
            }),
            ComputationError::FormulaInvalidResult { method, value } => json!({
                "method": method,
                "value": value.to_string(),
            }),
            ComputationError::InvalidInput { field, reason } => json!({
                "field": field,
                "reason": reason,
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum NetPayError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NetPayError {
    pub fn category(&self) -> &'static str {
        match self {
            NetPayError::Rule(e) => e.category(),
            NetPayError::Computation(e) => e.category(),
            NetPayError::SerializationError(_) => "error.serialization",
        }
    }

    pub fn details(&self) -> Value {
        match self {
            NetPayError::Rule(e) => e.details(),
            NetPayError::Computation(e) => e.details(),
            NetPayError::SerializationError(reason) => json!({ "reason": reason }),
        }
    }

    /// `{category, details, message}` object handed to front ends.
    pub fn to_payload(&self) -> Value {
        json!({
            "category": self.category(),
            "details": self.details(),
            "message": self.to_string(),
        })
    }
}

impl From<serde_json::Error> for NetPayError {
    fn from(e: serde_json::Error) -> Self {
        NetPayError::SerializationError(e.to_string())
    }
}
