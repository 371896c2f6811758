use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::brackets::{span_sum, BracketSlice};
use crate::engine::formula::{FormulaContext, FormulaInput, FormulaRegistry};
use crate::error::ComputationError;
use crate::rules::document::{IncomeTaxRules, TaxSchedule};
use crate::types::{Money, Rate, RoundingPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxKind {
    Progressive,
    Flat,
    Formula,
    DualSchedule,
}

/// How an income-tax amount was arrived at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxDetails {
    Progressive {
        slices: Vec<BracketSlice>,
    },
    Flat {
        rate: Rate,
    },
    Formula {
        method: String,
        unrounded: Money,
    },
    DualSchedule {
        region: String,
        national: Box<TaxComputation>,
        regional: Box<TaxComputation>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxComputation {
    pub taxable: Money,
    pub amount: Money,
    pub kind: TaxKind,
    pub details: TaxDetails,
}

/// Income tax on `taxable` under one rule set, rounded once at the end.
pub fn compute_by_rules(
    taxable: Money,
    rules: &IncomeTaxRules,
    policy: &RoundingPolicy,
    registry: &FormulaRegistry,
    formula_ctx: &FormulaContext<'_>,
) -> Result<TaxComputation, ComputationError> {
    let taxable = taxable.max(Decimal::ZERO);
    match &rules.schedule {
        TaxSchedule::Progressive { brackets } => {
            let (total, slices) = span_sum(taxable, brackets);
            Ok(TaxComputation {
                taxable,
                amount: policy.round(total),
                kind: TaxKind::Progressive,
                details: TaxDetails::Progressive { slices },
            })
        }
        TaxSchedule::Flat { rate } => Ok(TaxComputation {
            taxable,
            amount: policy.round(taxable * rate),
            kind: TaxKind::Flat,
            details: TaxDetails::Flat { rate: *rate },
        }),
        TaxSchedule::Formula {
            use_formula,
            method,
            parameters,
        } => {
            let missing = || ComputationError::FormulaMissing {
                method: method.clone(),
            };
            if !use_formula {
                return Err(missing());
            }
            let name = method.as_deref().ok_or_else(missing)?;
            let (method, strategy) = registry.resolve(name).ok_or_else(missing)?;

            let input = FormulaInput {
                taxable_income: taxable,
                parameters,
                rounding: *policy,
                context: *formula_ctx,
            };
            let raw = strategy(&input).map_err(|e| ComputationError::FormulaExecution {
                method: method.to_string(),
                reason: e.to_string(),
            })?;
            if raw < Decimal::ZERO {
                return Err(ComputationError::FormulaInvalidResult {
                    method: method.to_string(),
                    value: raw,
                });
            }
            tracing::trace!(%method, %taxable, %raw, "formula evaluated");

            Ok(TaxComputation {
                taxable,
                amount: policy.round(raw),
                kind: TaxKind::Formula,
                details: TaxDetails::Formula {
                    method: method.to_string(),
                    unrounded: raw,
                },
            })
        }
    }
}

/// National and regional schedules computed independently and summed.
pub fn compute_dual(
    taxable: Money,
    region: &str,
    national: &IncomeTaxRules,
    regional: &IncomeTaxRules,
    policy: &RoundingPolicy,
    registry: &FormulaRegistry,
    formula_ctx: &FormulaContext<'_>,
) -> Result<TaxComputation, ComputationError> {
    let national = compute_by_rules(taxable, national, policy, registry, formula_ctx)?;
    let regional = compute_by_rules(taxable, regional, policy, registry, formula_ctx)?;
    Ok(TaxComputation {
        taxable: taxable.max(Decimal::ZERO),
        amount: national.amount + regional.amount,
        kind: TaxKind::DualSchedule,
        details: TaxDetails::DualSchedule {
            region: region.to_string(),
            national: Box::new(national),
            regional: Box::new(regional),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::formula::{FormulaError, FormulaMethod};
    use crate::rules::document::{RateBracket, YearRules};
    use crate::types::RoundingMode;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn ctx(year: &YearRules) -> FormulaContext<'_> {
        FormulaContext {
            country_code: "XX",
            tax_class: None,
            children_count: 0,
            year_rules: year,
        }
    }

    fn formula(method: &str, parameters: serde_json::Value) -> IncomeTaxRules {
        serde_json::from_value(json!({
            "type": "formula",
            "useFormula": true,
            "method": method,
            "parameters": parameters
        }))
        .unwrap()
    }

    #[test]
    fn test_progressive_rounds_once() {
        let rules = IncomeTaxRules::progressive(vec![
            RateBracket { up_to: Some(dec!(10000)), rate: dec!(0.111) },
            RateBracket { up_to: None, rate: dec!(0.333) },
        ]);
        let year = YearRules::default();
        let result = compute_by_rules(
            dec!(10000.05),
            &rules,
            &RoundingPolicy::default(),
            &FormulaRegistry::default(),
            &ctx(&year),
        )
        .unwrap();
        // 1110 + 0.01665
        assert_eq!(result.amount, dec!(1110.02));
        assert_eq!(result.kind, TaxKind::Progressive);
        match result.details {
            TaxDetails::Progressive { slices } => assert_eq!(slices.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_flat_respects_rounding_mode() {
        let year = YearRules::default();
        let down = RoundingPolicy::new(RoundingMode::Down, 2);
        let result = compute_by_rules(
            dec!(333.33),
            &IncomeTaxRules::flat(dec!(0.1)),
            &down,
            &FormulaRegistry::default(),
            &ctx(&year),
        )
        .unwrap();
        assert_eq!(result.amount, dec!(33.33));
    }

    #[test]
    fn test_formula_requires_use_flag_and_known_method() {
        let year = YearRules::default();
        let registry = FormulaRegistry::default();
        let policy = RoundingPolicy::default();

        let mut disabled = formula("de_zoned_tariff", json!({}));
        if let TaxSchedule::Formula { use_formula, .. } = &mut disabled.schedule {
            *use_formula = false;
        }
        let err = compute_by_rules(dec!(1), &disabled, &policy, &registry, &ctx(&year)).unwrap_err();
        assert!(matches!(err, ComputationError::FormulaMissing { .. }));

        let unknown = formula("xx_tariff", json!({}));
        let err = compute_by_rules(dec!(1), &unknown, &policy, &registry, &ctx(&year)).unwrap_err();
        assert_eq!(err.category(), "error.formula_missing");

        let unregistered = formula("de_zoned_tariff", json!({}));
        let err = compute_by_rules(dec!(1), &unregistered, &policy, &FormulaRegistry::empty(), &ctx(&year))
            .unwrap_err();
        assert!(matches!(err, ComputationError::FormulaMissing { .. }));
    }

    #[test]
    fn test_formula_errors_are_fatal() {
        fn broken(_: &FormulaInput<'_>) -> Result<Decimal, FormulaError> {
            Err(FormulaError::InvalidParameters("boom".into()))
        }
        fn negative(_: &FormulaInput<'_>) -> Result<Decimal, FormulaError> {
            Ok(dec!(-1))
        }
        let year = YearRules::default();
        let policy = RoundingPolicy::default();
        let rules = formula("se_municipal_state_credit", json!({}));

        let mut registry = FormulaRegistry::empty();
        registry.register(FormulaMethod::SeMunicipalStateCredit, broken);
        let err = compute_by_rules(dec!(1), &rules, &policy, &registry, &ctx(&year)).unwrap_err();
        assert!(matches!(err, ComputationError::FormulaExecution { .. }));

        registry.register(FormulaMethod::SeMunicipalStateCredit, negative);
        let err = compute_by_rules(dec!(1), &rules, &policy, &registry, &ctx(&year)).unwrap_err();
        assert!(matches!(err, ComputationError::FormulaInvalidResult { .. }));
    }

    #[test]
    fn test_dual_schedule_sums_components() {
        let year = YearRules::default();
        let result = compute_dual(
            dec!(30000),
            "MD",
            &IncomeTaxRules::flat(dec!(0.1)),
            &IncomeTaxRules::flat(dec!(0.08)),
            &RoundingPolicy::default(),
            &FormulaRegistry::default(),
            &ctx(&year),
        )
        .unwrap();
        assert_eq!(result.amount, dec!(5400.00));
        match result.details {
            TaxDetails::DualSchedule { national, regional, .. } => {
                assert_eq!(national.amount, dec!(3000.00));
                assert_eq!(regional.amount, dec!(2400.00));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
