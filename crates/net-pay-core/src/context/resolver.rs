use std::collections::BTreeMap;

use crate::config::Diagnostics;
use crate::context::{CalcMode, ContextOptions, ResolvedIncomeTax, TaxContext};
use crate::error::{RuleError, TaxClassCause};
use crate::rules::document::{CountryRuleDocument, IncomeTaxRules, YearRules};
use crate::rules::merge::{apply_tax_class, MergedRules};
use crate::rules::repository::{normalize_country_code, RuleRepository};

/// Select the rules for one tax year.
pub fn resolve_year_rules(
    document: &CountryRuleDocument,
    year: i32,
) -> Result<&YearRules, RuleError> {
    document
        .year(year)
        .ok_or_else(|| RuleError::YearRulesNotFound {
            country_code: document.country_code.clone(),
            year,
        })
}

/// Load the country's document and build a context from it.
pub async fn build_tax_context_from_repository(
    repository: &RuleRepository,
    options: &ContextOptions,
) -> Result<TaxContext, RuleError> {
    let document = repository.load(&options.country_code).await?;
    build_tax_context(&document, options)
}

/// Resolve year, tax class and region into an immutable [`TaxContext`].
pub fn build_tax_context(
    document: &CountryRuleDocument,
    options: &ContextOptions,
) -> Result<TaxContext, RuleError> {
    let country_code = document_country_code(document, options)?;
    let year = options.year;
    let base = resolve_year_rules(document, year).map_err(|_| RuleError::YearRulesNotFound {
        country_code: country_code.clone(),
        year,
    })?;

    let mut warnings = Vec::new();
    let (tax_class, merged) = resolve_tax_class(&country_code, year, base, options, &mut warnings)?;
    let (income_tax, region) = resolve_income_tax(
        document,
        &country_code,
        year,
        base,
        merged.income_tax,
        options.region.as_deref(),
        &mut warnings,
    )?;

    let calc_mode = CalcMode::derive(&country_code, year, tax_class.as_deref(), income_tax.as_ref());
    tracing::debug!(%calc_mode, region = ?region, "tax context resolved");

    let mut notes = base.notes.clone();
    notes.extend(base.disclaimers.iter().cloned());

    Ok(TaxContext {
        country_code,
        country_name: document.name.clone(),
        currency: document.currency.clone(),
        year,
        region,
        tax_class,
        children_count: options.children_count,
        requires_tax_class: base.requires_tax_class(),
        income_tax,
        contributions: merged.contributions,
        other_taxes: merged.other_taxes,
        calculation: base.calculation,
        allowances: base.allowances.clone(),
        tax_credits: base.tax_credits.clone(),
        taxable_income: base.taxable_income.clone(),
        special_payments: base.special_payments.clone(),
        year_rules: base.clone(),
        notes,
        warnings,
        calc_mode,
    })
}

fn document_country_code(
    document: &CountryRuleDocument,
    options: &ContextOptions,
) -> Result<String, RuleError> {
    let requested = normalize_country_code(&options.country_code);
    let own = normalize_country_code(&document.country_code);
    match (own.is_empty(), requested.is_empty()) {
        (true, _) => Ok(requested),
        (false, true) => Ok(own),
        (false, false) if own == requested => Ok(own),
        (false, false) => Err(RuleError::InvalidRuleDocument {
            country_code: requested,
            reason: format!("document belongs to {own}"),
        }),
    }
}

/// Exact key first, then a case-insensitive match.
fn find_key<'a, V>(map: &'a BTreeMap<String, V>, selector: &str) -> Option<(&'a String, &'a V)> {
    map.get_key_value(selector).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(selector))
    })
}

fn non_empty(selector: Option<&str>) -> Option<&str> {
    selector.map(str::trim).filter(|s| !s.is_empty())
}

fn resolve_tax_class(
    country_code: &str,
    year: i32,
    base: &YearRules,
    options: &ContextOptions,
    warnings: &mut Vec<String>,
) -> Result<(Option<String>, MergedRules), RuleError> {
    let selector = non_empty(options.tax_class.as_deref());

    if !base.requires_tax_class() {
        if let Some(selector) = selector {
            tracing::warn!(country = country_code, year, tax_class = selector, "tax class ignored");
            warnings.push(format!(
                "{country_code} {year} has no tax classes; '{selector}' was ignored"
            ));
        }
        return Ok((None, MergedRules::unchanged(base)));
    }

    let invalid = |tax_class: Option<&str>, cause| RuleError::InvalidTaxClass {
        country_code: country_code.to_string(),
        year,
        tax_class: tax_class.map(str::to_string),
        cause,
    };

    let selector = selector.ok_or_else(|| invalid(None, TaxClassCause::MissingRequired))?;
    let (key, class) = find_key(&base.tax_classes, selector)
        .ok_or_else(|| invalid(Some(selector), TaxClassCause::Unknown))?;

    let merged = apply_tax_class(country_code, base, class)?;

    if options.diagnostics != Diagnostics::Off && merged.income_tax == base.income_tax {
        if options.diagnostics == Diagnostics::Strict {
            return Err(invalid(Some(key), TaxClassCause::NoEffect));
        }
        tracing::warn!(
            country = country_code,
            year,
            tax_class = %key,
            "tax class has no observable effect on income tax"
        );
        warnings.push(format!(
            "tax class {key} does not change the income tax rules for {country_code} {year}"
        ));
    }

    Ok((Some(key.clone()), merged))
}

fn resolve_income_tax(
    document: &CountryRuleDocument,
    country_code: &str,
    year: i32,
    base: &YearRules,
    merged: Option<IncomeTaxRules>,
    region: Option<&str>,
    warnings: &mut Vec<String>,
) -> Result<(Option<ResolvedIncomeTax>, Option<String>), RuleError> {
    if !base.uses_dual_schedule() {
        if let Some(region) = non_empty(region) {
            tracing::debug!(country = country_code, region, "region ignored for single schedule");
            warnings.push(format!(
                "{country_code} {year} has a single schedule; region '{region}' was ignored"
            ));
        }
        return Ok((merged.map(|rules| ResolvedIncomeTax::Single { rules }), None));
    }

    let selector = non_empty(region)
        .or_else(|| non_empty(document.default_region.as_deref()))
        .ok_or_else(|| RuleError::NoRegionSelected {
            country_code: country_code.to_string(),
            year,
        })?;

    let (key, pair) = find_key(&base.regions, selector).ok_or_else(|| RuleError::UnknownRegion {
        country_code: country_code.to_string(),
        year,
        region: selector.to_string(),
    })?;

    Ok((
        Some(ResolvedIncomeTax::Dual {
            region: key.clone(),
            national: pair.national.clone(),
            regional: pair.regional.clone(),
        }),
        Some(key.clone()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::document::TaxSchedule;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn classed_document() -> CountryRuleDocument {
        serde_json::from_value(json!({
            "countryCode": "DE",
            "name": "Germany",
            "currency": "EUR",
            "years": {
                "2026": {
                    "incomeTax": {"type": "flat", "rate": 0.2},
                    "socialContributions": {"health": {"employeeRate": 0.08}},
                    "taxClasses": {
                        "I": {"incomeTax": {"rate": 0.25}},
                        "III": {"incomeTax": {"rate": 0.15},
                                "socialContributions": {"health": {"employeeRate": 0.07}}},
                        "IV": {"socialContributions": {"health": {"employeeRate": 0.09}}}
                    },
                    "notes": ["approximation"]
                }
            }
        }))
        .unwrap()
    }

    fn regional_document() -> CountryRuleDocument {
        serde_json::from_value(json!({
            "countryCode": "ES",
            "name": "Spain",
            "currency": "EUR",
            "defaultRegion": "MD",
            "years": {
                "2026": {
                    "regions": {
                        "MD": {"national": {"type": "flat", "rate": 0.1},
                               "regional": {"type": "flat", "rate": 0.08}},
                        "CT": {"national": {"type": "flat", "rate": 0.1},
                               "regional": {"type": "flat", "rate": 0.12}}
                    },
                    "allowances": [{"name": "general", "amount": 2000}]
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_missing_year_fails() {
        let doc = classed_document();
        let err = resolve_year_rules(&doc, 1999).unwrap_err();
        assert!(matches!(err, RuleError::YearRulesNotFound { year: 1999, .. }));
    }

    #[test]
    fn test_class_required_when_map_non_empty() {
        let doc = classed_document();
        let err = build_tax_context(&doc, &ContextOptions::new("DE", 2026)).unwrap_err();
        match err {
            RuleError::InvalidTaxClass { cause, .. } => {
                assert_eq!(cause, TaxClassCause::MissingRequired)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_class_rejected() {
        let doc = classed_document();
        let err = build_tax_context(&doc, &ContextOptions::new("DE", 2026).tax_class("VII"))
            .unwrap_err();
        match err {
            RuleError::InvalidTaxClass { cause, tax_class, .. } => {
                assert_eq!(cause, TaxClassCause::Unknown);
                assert_eq!(tax_class.as_deref(), Some("VII"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_class_override_applied_and_fingerprinted() {
        let doc = classed_document();
        let ctx =
            build_tax_context(&doc, &ContextOptions::new("de", 2026).tax_class("iii")).unwrap();
        assert_eq!(ctx.tax_class(), Some("III"));
        assert_eq!(ctx.contributions().schemes["health"].employee_rate, dec!(0.07));
        match ctx.income_tax() {
            Some(ResolvedIncomeTax::Single { rules }) => {
                assert_eq!(rules.schedule, TaxSchedule::Flat { rate: dec!(0.15) })
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ctx.calc_mode().matches("DE", 2026, Some("III")));
        assert_eq!(ctx.calc_mode().method(), "flat");
        assert!(ctx.warnings().is_empty());
        assert_eq!(ctx.notes(), ["approximation".to_string()]);
    }

    #[test]
    fn test_no_effect_class_warns_by_default() {
        let doc = classed_document();
        let ctx = build_tax_context(&doc, &ContextOptions::new("DE", 2026).tax_class("IV")).unwrap();
        assert_eq!(ctx.warnings().len(), 1);
        assert!(ctx.warnings()[0].contains("IV"));
    }

    #[test]
    fn test_no_effect_class_fails_when_strict() {
        let doc = classed_document();
        let options = ContextOptions::new("DE", 2026)
            .tax_class("IV")
            .diagnostics(Diagnostics::Strict);
        let err = build_tax_context(&doc, &options).unwrap_err();
        assert!(matches!(
            err,
            RuleError::InvalidTaxClass {
                cause: TaxClassCause::NoEffect,
                ..
            }
        ));
    }

    #[test]
    fn test_no_effect_check_can_be_disabled() {
        let doc = classed_document();
        let options = ContextOptions::new("DE", 2026)
            .tax_class("IV")
            .diagnostics(Diagnostics::Off);
        let ctx = build_tax_context(&doc, &options).unwrap();
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn test_base_document_not_mutated_by_override() {
        let doc = classed_document();
        let before = doc.clone();
        build_tax_context(&doc, &ContextOptions::new("DE", 2026).tax_class("III")).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_region_default_used() {
        let doc = regional_document();
        let ctx = build_tax_context(&doc, &ContextOptions::new("ES", 2026)).unwrap();
        assert_eq!(ctx.region(), Some("MD"));
        assert_eq!(ctx.calc_mode().method(), "dual_schedule");
        assert_eq!(ctx.allowances()[0].amount, dec!(2000));
    }

    #[test]
    fn test_region_selector_wins() {
        let doc = regional_document();
        let ctx = build_tax_context(&doc, &ContextOptions::new("ES", 2026).region("ct")).unwrap();
        match ctx.income_tax() {
            Some(ResolvedIncomeTax::Dual { region, regional, .. }) => {
                assert_eq!(region, "CT");
                assert_eq!(regional.schedule, TaxSchedule::Flat { rate: dec!(0.12) });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_no_region_and_no_default_fails() {
        let mut doc = regional_document();
        doc.default_region = None;
        let err = build_tax_context(&doc, &ContextOptions::new("ES", 2026)).unwrap_err();
        assert!(matches!(err, RuleError::NoRegionSelected { .. }));
    }

    #[test]
    fn test_unknown_region_fails() {
        let doc = regional_document();
        let err =
            build_tax_context(&doc, &ContextOptions::new("ES", 2026).region("ZZ")).unwrap_err();
        assert!(matches!(err, RuleError::UnknownRegion { .. }));
    }

    #[test]
    fn test_document_for_other_country_rejected() {
        let doc = regional_document();
        let err = build_tax_context(&doc, &ContextOptions::new("DE", 2026)).unwrap_err();
        assert_eq!(err.category(), "error.invalid_rule_document");
    }

    #[test]
    fn test_class_ignored_without_class_map() {
        let doc = regional_document();
        let ctx =
            build_tax_context(&doc, &ContextOptions::new("ES", 2026).tax_class("I")).unwrap();
        assert_eq!(ctx.tax_class(), None);
        assert_eq!(ctx.warnings().len(), 1);
    }
}
