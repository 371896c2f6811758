use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::document::{CreditTier, TaxCredit};
use crate::types::{Money, Rate, RoundingPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditLine {
    pub name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditSummary {
    pub lines: Vec<CreditLine>,
    /// Sum of all credits before the income-tax limit.
    pub computed_total: Money,
    /// Portion actually offset against income tax.
    pub applied: Money,
}

/// Full credit up to `start`, nothing from `end`; linear in between unless a
/// fixed withdrawal `rate` is given.
pub fn phase_out_amount(
    income: Money,
    max: Money,
    start: Money,
    end: Money,
    rate: Option<Rate>,
) -> Money {
    if income <= start {
        return max.max(Decimal::ZERO);
    }
    let amount = match rate {
        Some(rate) => max - rate * (income - start),
        None if end > start => {
            if income >= end {
                Decimal::ZERO
            } else {
                max * (end - income) / (end - start)
            }
        }
        None => Decimal::ZERO,
    };
    amount.clamp(Decimal::ZERO, max.max(Decimal::ZERO))
}

/// `base + rate * (income - over)` from the first tier covering `income`.
/// Income above every bounded tier earns nothing.
pub fn segmented_amount(income: Money, tiers: &[CreditTier]) -> Money {
    tiers
        .iter()
        .find(|t| t.up_to.map_or(true, |up_to| income <= up_to))
        .map(|t| (t.base + t.rate * (income - t.over)).max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

/// Evaluate every credit on `taxable` and cap the total at `income_tax`.
pub fn apply_credits(
    taxable: Money,
    income_tax: Money,
    credits: &[TaxCredit],
    rounding: &RoundingPolicy,
) -> CreditSummary {
    let lines: Vec<CreditLine> = credits
        .iter()
        .map(|credit| {
            let amount = match credit {
                TaxCredit::PhaseOut {
                    max,
                    phaseout_start,
                    phaseout_end,
                    rate,
                    ..
                } => phase_out_amount(taxable, *max, *phaseout_start, *phaseout_end, *rate),
                TaxCredit::Segmented { tiers, .. } => segmented_amount(taxable, tiers),
            };
            CreditLine {
                name: credit.name().to_string(),
                amount: rounding.round(amount),
            }
        })
        .collect();

    let computed_total: Money = lines.iter().map(|l| l.amount).sum();
    let applied = computed_total.min(income_tax.max(Decimal::ZERO));

    CreditSummary {
        lines,
        computed_total,
        applied,
    }
}
