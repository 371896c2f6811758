//! Formula-driven income tax.
//!
//! Rule documents name a method; the registry maps each [`FormulaMethod`] to
//! a pure strategy function. Strategies receive the raw parameter object from
//! the document and parse what they need.

pub mod french;
pub mod german;
pub mod swedish;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::rules::document::YearRules;
use crate::types::{Money, RoundingPolicy};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("Invalid formula parameters: {0}")]
    InvalidParameters(String),

    #[error("Unknown formula method '{0}'")]
    UnknownMethod(String),
}

impl FormulaError {
    pub(crate) fn missing(key: &str) -> Self {
        FormulaError::InvalidParameters(format!("missing '{key}'"))
    }
}

/// Every formula method the engine knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormulaMethod {
    /// Zoned polynomial tariff with optional splitting and minimum-rate overlay.
    DeZonedTariff,
    /// Municipal + state tax less a piecewise-linear earned-income credit.
    SeMunicipalStateCredit,
    /// Progressive tariff applied per household part.
    FrFamilyQuotient,
}

impl FormulaMethod {
    pub const ALL: [FormulaMethod; 3] = [
        FormulaMethod::DeZonedTariff,
        FormulaMethod::SeMunicipalStateCredit,
        FormulaMethod::FrFamilyQuotient,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaMethod::DeZonedTariff => "de_zoned_tariff",
            FormulaMethod::SeMunicipalStateCredit => "se_municipal_state_credit",
            FormulaMethod::FrFamilyQuotient => "fr_family_quotient",
        }
    }
}

impl fmt::Display for FormulaMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormulaMethod {
    type Err = FormulaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        FormulaMethod::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| FormulaError::UnknownMethod(name.to_string()))
    }
}

/// Context fields a strategy may read besides its parameters.
#[derive(Debug, Clone, Copy)]
pub struct FormulaContext<'a> {
    pub country_code: &'a str,
    pub tax_class: Option<&'a str>,
    pub children_count: u32,
    pub year_rules: &'a YearRules,
}

#[derive(Debug, Clone, Copy)]
pub struct FormulaInput<'a> {
    pub taxable_income: Money,
    pub parameters: &'a Map<String, Value>,
    pub rounding: RoundingPolicy,
    pub context: FormulaContext<'a>,
}

impl<'a> FormulaInput<'a> {
    pub fn params(&self) -> Params<'a> {
        Params::new(self.parameters)
    }
}

pub type FormulaFn = fn(&FormulaInput<'_>) -> Result<Decimal, FormulaError>;

/// Method -> strategy table. Registration replaces; nothing is removed.
#[derive(Clone)]
pub struct FormulaRegistry {
    strategies: HashMap<FormulaMethod, FormulaFn>,
}

impl fmt::Debug for FormulaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormulaRegistry")
            .field("methods", &self.methods())
            .finish()
    }
}

impl Default for FormulaRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FormulaRegistry {
    /// Registry with no strategies.
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register(FormulaMethod::DeZonedTariff, german::zoned_tariff)
            .register(FormulaMethod::SeMunicipalStateCredit, swedish::municipal_state_credit)
            .register(FormulaMethod::FrFamilyQuotient, french::family_quotient);
        registry
    }

    pub fn register(&mut self, method: FormulaMethod, strategy: FormulaFn) -> &mut Self {
        self.strategies.insert(method, strategy);
        self
    }

    pub fn get(&self, method: FormulaMethod) -> Option<FormulaFn> {
        self.strategies.get(&method).copied()
    }

    /// Look a strategy up by its document name.
    pub fn resolve(&self, name: &str) -> Option<(FormulaMethod, FormulaFn)> {
        let method = name.parse().ok()?;
        self.get(method).map(|f| (method, f))
    }

    /// Registered methods in declaration order.
    pub fn methods(&self) -> Vec<FormulaMethod> {
        FormulaMethod::ALL
            .into_iter()
            .filter(|m| self.strategies.contains_key(m))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Parameter access
// ---------------------------------------------------------------------------

/// Decimal from a JSON number or numeric string.
pub fn value_to_decimal(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

/// Typed view over a raw parameter object.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Params<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn decimal(&self, key: &str) -> Result<Decimal, FormulaError> {
        self.opt_decimal(key)?.ok_or_else(|| FormulaError::missing(key))
    }

    pub fn opt_decimal(&self, key: &str) -> Result<Option<Decimal>, FormulaError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value_to_decimal(value).map(Some).ok_or_else(|| {
                FormulaError::InvalidParameters(format!("'{key}' is not a number"))
            }),
        }
    }

    pub fn decimal_or(&self, key: &str, default: Decimal) -> Result<Decimal, FormulaError> {
        Ok(self.opt_decimal(key)?.unwrap_or(default))
    }

    pub fn object(&self, key: &str) -> Result<Params<'a>, FormulaError> {
        match self.map.get(key) {
            Some(Value::Object(map)) => Ok(Params::new(map)),
            Some(_) => Err(FormulaError::InvalidParameters(format!(
                "'{key}' must be an object"
            ))),
            None => Err(FormulaError::missing(key)),
        }
    }

    pub fn flag(&self, key: &str) -> Result<bool, FormulaError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(FormulaError::InvalidParameters(format!(
                "'{key}' must be a boolean"
            ))),
        }
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>, FormulaError> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|_| {
                FormulaError::InvalidParameters(format!("'{key}' must be a list of strings"))
            }),
        }
    }

    /// Deserialize a nested structure such as a bracket list.
    pub fn typed<T: DeserializeOwned>(&self, key: &str) -> Result<T, FormulaError> {
        let value = self.map.get(key).ok_or_else(|| FormulaError::missing(key))?;
        serde_json::from_value(value.clone())
            .map_err(|e| FormulaError::InvalidParameters(format!("'{key}': {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn doubled(input: &FormulaInput<'_>) -> Result<Decimal, FormulaError> {
        Ok(input.taxable_income * dec!(2))
    }

    #[test]
    fn test_method_names_round_trip() {
        for method in FormulaMethod::ALL {
            assert_eq!(method.as_str().parse::<FormulaMethod>().unwrap(), method);
            let json = serde_json::to_value(method).unwrap();
            assert_eq!(json, json!(method.as_str()));
        }
        assert!("xx_unknown".parse::<FormulaMethod>().is_err());
    }

    #[test]
    fn test_defaults_register_every_method() {
        let registry = FormulaRegistry::with_defaults();
        assert_eq!(registry.methods(), FormulaMethod::ALL.to_vec());
        assert!(registry.resolve("de_zoned_tariff").is_some());
        assert!(registry.resolve("nope").is_none());
    }

    #[test]
    fn test_register_last_write_wins() {
        let mut registry = FormulaRegistry::empty();
        assert!(registry.get(FormulaMethod::DeZonedTariff).is_none());
        registry.register(FormulaMethod::DeZonedTariff, german::zoned_tariff);
        registry.register(FormulaMethod::DeZonedTariff, doubled);

        let params = Map::new();
        let year = YearRules::default();
        let input = FormulaInput {
            taxable_income: dec!(10),
            parameters: &params,
            rounding: RoundingPolicy::default(),
            context: FormulaContext {
                country_code: "DE",
                tax_class: None,
                children_count: 0,
                year_rules: &year,
            },
        };
        let strategy = registry.get(FormulaMethod::DeZonedTariff).unwrap();
        assert_eq!(strategy(&input).unwrap(), dec!(20));
    }

    #[test]
    fn test_params_accept_numbers_and_strings() {
        let map = json!({"a": 12348, "b": "0.42", "c": 1.5e3, "d": true, "nested": {"x": 1}})
            .as_object()
            .cloned()
            .unwrap();
        let params = Params::new(&map);
        assert_eq!(params.decimal("a").unwrap(), dec!(12348));
        assert_eq!(params.decimal("b").unwrap(), dec!(0.42));
        assert_eq!(params.decimal("c").unwrap(), dec!(1500));
        assert!(params.flag("d").unwrap());
        assert!(!params.flag("missing").unwrap());
        assert_eq!(params.object("nested").unwrap().decimal("x").unwrap(), dec!(1));
        assert!(matches!(params.decimal("d"), Err(FormulaError::InvalidParameters(_))));
        assert!(matches!(params.decimal("zz"), Err(FormulaError::InvalidParameters(_))));
    }
}
