use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::RuleError;
use crate::rules::document::{
    ContributionRules, IncomeTaxRules, OtherTaxRule, TaxClassOverride, TaxSchedule, YearRules,
};

/// Parameter key a tax class's taxable-income adjustment is injected under.
pub const TAXABLE_INCOME_ADJUSTMENT_KEY: &str = "taxableIncomeAdjustment";

/// Recursive merge where the overlay wins per key.
///
/// Objects merge key by key when both sides are objects; arrays and
/// primitives on the overlay replace the base. The base is never mutated and
/// an absent overlay yields a copy of the base.
pub fn deep_merge(base: &Value, overlay: Option<&Value>) -> Value {
    match overlay {
        None => base.clone(),
        Some(overlay) => merge_values(base, overlay),
    }
}

fn merge_values(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in overlay_map {
                let next = match base_map.get(key) {
                    Some(existing) => merge_values(existing, value),
                    None => value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        _ => overlay.clone(),
    }
}

/// Rule sections after a tax class has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRules {
    pub income_tax: Option<IncomeTaxRules>,
    pub contributions: ContributionRules,
    pub other_taxes: BTreeMap<String, OtherTaxRule>,
}

impl MergedRules {
    pub fn unchanged(base: &YearRules) -> Self {
        Self {
            income_tax: base.income_tax.clone(),
            contributions: base.social_contributions.clone(),
            other_taxes: base.other_taxes.clone(),
        }
    }
}

/// Apply a tax-class override onto the year's base sections.
pub fn apply_tax_class(
    country_code: &str,
    base: &YearRules,
    class: &TaxClassOverride,
) -> Result<MergedRules, RuleError> {
    let invalid = |reason: String| RuleError::InvalidRuleDocument {
        country_code: country_code.to_string(),
        reason,
    };

    let mut income_tax = merge_section(&base.income_tax, class.income_tax.as_ref(), "incomeTax")
        .map_err(invalid)?;
    let contributions = merge_section(
        &base.social_contributions,
        class.social_contributions.as_ref(),
        "socialContributions",
    )
    .map_err(invalid)?;
    let other_taxes = merge_section(&base.other_taxes, class.other_taxes.as_ref(), "otherTaxes")
        .map_err(invalid)?;

    if let (Some(adjustment), Some(rules)) = (class.taxable_income_adjustment, income_tax.as_mut())
    {
        if let TaxSchedule::Formula { parameters, .. } = &mut rules.schedule {
            parameters.insert(
                TAXABLE_INCOME_ADJUSTMENT_KEY.to_string(),
                Value::String(adjustment.to_string()),
            );
        }
    }

    Ok(MergedRules {
        income_tax,
        contributions,
        other_taxes,
    })
}

fn merge_section<T>(base: &T, overlay: Option<&Value>, section: &str) -> Result<T, String>
where
    T: Serialize + DeserializeOwned + Clone,
{
    let Some(overlay) = overlay else {
        return Ok(base.clone());
    };
    let base_value =
        serde_json::to_value(base).map_err(|e| format!("{section}: cannot serialize base: {e}"))?;
    let merged = deep_merge(&base_value, Some(overlay));
    serde_json::from_value(merged).map_err(|e| format!("{section}: {e}"))
}
