use std::fmt;

use serde::{Deserialize, Serialize};

use crate::context::ResolvedIncomeTax;

/// Method name recorded for national + regional schedules.
pub const DUAL_SCHEDULE_METHOD: &str = "dual_schedule";

/// Method name recorded when a year carries no income-tax rules.
pub const NO_INCOME_TAX_METHOD: &str = "none";

/// Fingerprint of the resolved computation path.
///
/// Built once by the resolver and never changed. `compute_salary` rejects a
/// context whose fingerprint disagrees with its own country, year or class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcMode {
    country_code: String,
    year: i32,
    tax_class: Option<String>,
    method: String,
}

impl CalcMode {
    pub(crate) fn derive(
        country_code: &str,
        year: i32,
        tax_class: Option<&str>,
        income_tax: Option<&ResolvedIncomeTax>,
    ) -> Self {
        let method = match income_tax {
            Some(ResolvedIncomeTax::Single { rules }) => rules.method_name(),
            Some(ResolvedIncomeTax::Dual { .. }) => DUAL_SCHEDULE_METHOD.to_string(),
            None => NO_INCOME_TAX_METHOD.to_string(),
        };
        Self {
            country_code: country_code.to_string(),
            year,
            tax_class: tax_class.map(str::to_string),
            method,
        }
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn tax_class(&self) -> Option<&str> {
        self.tax_class.as_deref()
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn matches(&self, country_code: &str, year: i32, tax_class: Option<&str>) -> bool {
        self.country_code == country_code && self.year == year && self.tax_class() == tax_class
    }
}

impl fmt::Display for CalcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.country_code,
            self.year,
            self.tax_class.as_deref().unwrap_or("-"),
            self.method
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::document::IncomeTaxRules;
    use rust_decimal_macros::dec;

    #[test]
    fn test_method_from_rule_type() {
        let single = ResolvedIncomeTax::Single {
            rules: IncomeTaxRules::flat(dec!(0.2)),
        };
        let mode = CalcMode::derive("EE", 2026, None, Some(&single));
        assert_eq!(mode.method(), "flat");
        assert_eq!(mode.to_string(), "EE/2026/-/flat");
    }

    #[test]
    fn test_dual_and_missing_methods() {
        let dual = ResolvedIncomeTax::Dual {
            region: "MD".into(),
            national: IncomeTaxRules::flat(dec!(0.1)),
            regional: IncomeTaxRules::flat(dec!(0.1)),
        };
        assert_eq!(
            CalcMode::derive("ES", 2026, None, Some(&dual)).method(),
            DUAL_SCHEDULE_METHOD
        );
        assert_eq!(
            CalcMode::derive("ES", 2026, None, None).method(),
            NO_INCOME_TAX_METHOD
        );
    }

    #[test]
    fn test_matches_checks_every_field() {
        let mode = CalcMode::derive("DE", 2026, Some("III"), None);
        assert!(mode.matches("DE", 2026, Some("III")));
        assert!(!mode.matches("DE", 2025, Some("III")));
        assert!(!mode.matches("AT", 2026, Some("III")));
        assert!(!mode.matches("DE", 2026, None));
    }
}
