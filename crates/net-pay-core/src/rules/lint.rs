use serde::Serialize;

use crate::error::RuleError;
use crate::rules::document::CountryRuleDocument;
use crate::rules::merge::apply_tax_class;

/// A tax class whose override leaves the income-tax rules unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxClassDiagnostic {
    pub country_code: String,
    pub year: String,
    pub tax_class: String,
    pub message: String,
}

/// Check every tax class of every year for an observable income-tax effect.
///
/// Classes whose fragments fail to merge are reported as errors rather than
/// diagnostics.
pub fn lint_document(document: &CountryRuleDocument) -> Result<Vec<TaxClassDiagnostic>, RuleError> {
    let mut diagnostics = Vec::new();
    for (year_key, year) in &document.years {
        for (class_key, class) in &year.tax_classes {
            let merged = apply_tax_class(&document.country_code, year, class)?;
            if merged.income_tax == year.income_tax {
                diagnostics.push(TaxClassDiagnostic {
                    country_code: document.country_code.clone(),
                    year: year_key.clone(),
                    tax_class: class_key.clone(),
                    message: format!(
                        "tax class {class_key} does not change the income tax rules for {year_key}"
                    ),
                });
            }
        }
    }
    Ok(diagnostics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flags_class_without_income_tax_effect() {
        let doc: CountryRuleDocument = serde_json::from_value(json!({
            "countryCode": "DE",
            "name": "Germany",
            "currency": "EUR",
            "years": {
                "2026": {
                    "incomeTax": {"type": "flat", "rate": 0.2},
                    "taxClasses": {
                        "A": {"incomeTax": {"rate": 0.25}},
                        "B": {"socialContributions": {}},
                        "C": {"incomeTax": {"rate": 0.2}}
                    }
                }
            }
        }))
        .unwrap();
        let diagnostics = lint_document(&doc).unwrap();
        let classes: Vec<&str> = diagnostics.iter().map(|d| d.tax_class.as_str()).collect();
        assert_eq!(classes, vec!["B", "C"]);
        assert_eq!(diagnostics[0].year, "2026");
    }

    #[test]
    fn test_clean_document_has_no_diagnostics() {
        let doc: CountryRuleDocument = serde_json::from_value(json!({
            "name": "Nowhere",
            "currency": "EUR",
            "years": {"2026": {"incomeTax": {"type": "flat", "rate": 0.2}}}
        }))
        .unwrap();
        assert!(lint_document(&doc).unwrap().is_empty());
    }
}
