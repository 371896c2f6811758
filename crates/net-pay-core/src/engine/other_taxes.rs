use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::document::{Incidence, OtherTaxRule, TaxBasis, ThresholdKind};
use crate::types::{Money, RoundingPolicy};

/// Amounts another tax can be levied on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaxBases {
    pub gross: Money,
    pub taxable_income: Money,
    /// Income tax after credits.
    pub income_tax: Money,
}

impl TaxBases {
    pub fn get(&self, basis: TaxBasis) -> Money {
        match basis {
            TaxBasis::Gross => self.gross,
            TaxBasis::TaxableIncome => self.taxable_income,
            TaxBasis::IncomeTax => self.income_tax,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherTaxLine {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub applies: bool,
    pub basis: TaxBasis,
    pub basis_amount: Money,
    pub incidence: Incidence,
    pub amount: Money,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherTaxTotals {
    pub lines: Vec<OtherTaxLine>,
    pub employee_total: Money,
    pub employer_total: Money,
}

/// Unrounded levy on `basis` under one rule.
pub fn levy(rule: &OtherTaxRule, basis: Money) -> Money {
    let basis = basis.max(Decimal::ZERO);
    let amount = match (rule.threshold, rule.threshold_kind) {
        (None, _) => basis * rule.rate,
        (Some(threshold), ThresholdKind::Allowance) => {
            (basis - threshold).max(Decimal::ZERO) * rule.rate
        }
        (Some(threshold), ThresholdKind::ExemptionLimit) => {
            if basis <= threshold {
                Decimal::ZERO
            } else {
                let full = basis * rule.rate;
                match rule.taper_rate {
                    Some(taper) => full.min(taper * (basis - threshold)),
                    None => full,
                }
            }
        }
    };
    match rule.cap {
        Some(cap) => amount.min(cap),
        None => amount,
    }
    .max(Decimal::ZERO)
}

pub fn compute_other_taxes(
    bases: &TaxBases,
    rules: &BTreeMap<String, OtherTaxRule>,
    rounding: &RoundingPolicy,
) -> OtherTaxTotals {
    let mut totals = OtherTaxTotals::default();
    for (id, rule) in rules {
        let basis_amount = bases.get(rule.basis);
        let amount = if rule.applies {
            rounding.round(levy(rule, basis_amount))
        } else {
            Decimal::ZERO
        };
        match rule.incidence {
            Incidence::Employee => totals.employee_total += amount,
            Incidence::Employer => totals.employer_total += amount,
        }
        totals.lines.push(OtherTaxLine {
            id: id.clone(),
            label: rule.label.clone(),
            applies: rule.applies,
            basis: rule.basis,
            basis_amount,
            incidence: rule.incidence,
            amount,
        });
    }
    totals
}
