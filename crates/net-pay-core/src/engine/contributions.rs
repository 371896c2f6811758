use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::engine::brackets::span_sum;
use crate::rules::document::{ContributionRules, ContributionScheme, LowIncomeTier};
use crate::types::{Money, Rate, RoundingPolicy};

/// Which part of a split salary a contribution run covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomePortion {
    #[default]
    Regular,
    /// 13th/14th-month payments.
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionOptions {
    pub portion: IncomePortion,
    /// Months the annual gross is spread over for low-income tier lookups.
    pub months_divisor: Decimal,
    pub rounding: RoundingPolicy,
}

impl Default for ContributionOptions {
    fn default() -> Self {
        Self::regular(RoundingPolicy::default())
    }
}

impl ContributionOptions {
    pub fn regular(rounding: RoundingPolicy) -> Self {
        Self {
            portion: IncomePortion::Regular,
            months_divisor: dec!(12),
            rounding,
        }
    }

    pub fn special(rounding: RoundingPolicy) -> Self {
        Self {
            portion: IncomePortion::Special,
            ..Self::regular(rounding)
        }
    }

    pub fn months_divisor(mut self, months: Decimal) -> Self {
        self.months_divisor = months;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionLine {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub applies: bool,
    pub base: Money,
    pub employee: Money,
    pub employer: Money,
    pub deductible: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionTotals {
    pub lines: Vec<ContributionLine>,
    pub employee_total: Money,
    pub employer_total: Money,
    pub deductible_employee_total: Money,
}

impl ContributionTotals {
    fn push(&mut self, line: ContributionLine) {
        self.employee_total += line.employee;
        self.employer_total += line.employer;
        if line.deductible {
            self.deductible_employee_total += line.employee;
        }
        self.lines.push(line);
    }
}

/// Contribution base: gross clamped to `[floor, ceiling]`, never negative.
///
/// The special portion uses `special_ceiling` when the scheme has one and
/// skips the floor. A zero gross never picks up a floor.
pub fn effective_base(gross: Money, scheme: &ContributionScheme, portion: IncomePortion) -> Money {
    if gross <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ceiling = match portion {
        IncomePortion::Regular => scheme.ceiling,
        IncomePortion::Special => scheme.special_ceiling.or(scheme.ceiling),
    };
    // The annual floor is met by the regular run alone
    let floor = match portion {
        IncomePortion::Regular => scheme.floor.unwrap_or(Decimal::ZERO),
        IncomePortion::Special => Decimal::ZERO,
    };
    let mut base = gross.max(floor);
    if let Some(ceiling) = ceiling {
        base = base.min(ceiling);
    }
    base.max(Decimal::ZERO)
}

/// First tier whose closed interval contains the monthly amount.
///
/// A gap between one tier's `upTo` and the next tier's `from` belongs to the
/// lower tier.
fn low_income_rate(tiers: &[LowIncomeTier], monthly: Money) -> Option<Rate> {
    tiers
        .iter()
        .enumerate()
        .find(|&(i, t)| {
            let gap_end = tiers
                .get(i + 1)
                .map(|next| next.from)
                .filter(|from| *from > t.up_to);
            monthly >= t.from
                && (monthly <= t.up_to || gap_end.is_some_and(|end| monthly < end))
        })
        .map(|(_, t)| t.rate)
}

fn scheme_line(
    id: String,
    gross: Money,
    scheme: &ContributionScheme,
    opts: &ContributionOptions,
) -> ContributionLine {
    if !scheme.applies {
        return ContributionLine {
            id,
            label: scheme.label.clone(),
            applies: false,
            base: Decimal::ZERO,
            employee: Decimal::ZERO,
            employer: Decimal::ZERO,
            deductible: scheme.deductible_for_tax,
        };
    }

    let base = effective_base(gross, scheme, opts.portion);

    let employee = if !scheme.bracketed_employee.is_empty() {
        span_sum(base, &scheme.bracketed_employee).0
    } else {
        let tier_rate = match opts.portion {
            IncomePortion::Regular if opts.months_divisor > Decimal::ZERO => {
                let monthly = opts.rounding.round(gross / opts.months_divisor);
                low_income_rate(&scheme.low_income_employee_tiers, monthly)
            }
            _ => None,
        };
        base * tier_rate.unwrap_or(scheme.employee_rate)
    };

    let employer = match scheme.employer_threshold {
        Some(threshold) => (base - threshold).max(Decimal::ZERO) * scheme.employer_rate,
        None => base * scheme.employer_rate,
    };

    ContributionLine {
        id,
        label: scheme.label.clone(),
        applies: true,
        base: opts.rounding.round(base),
        employee: opts.rounding.round(employee),
        employer: opts.rounding.round(employer),
        deductible: scheme.deductible_for_tax,
    }
}

/// Employee and employer amounts for every scheme on one annual gross.
pub fn compute_annual(
    gross_annual: Money,
    rules: &ContributionRules,
    opts: &ContributionOptions,
) -> ContributionTotals {
    let mut totals = ContributionTotals::default();
    for (id, scheme) in rules.iter_with_ids() {
        totals.push(scheme_line(id, gross_annual, scheme, opts));
    }
    totals
}

/// Sum regular and special runs per scheme id, regular order first.
pub fn merge_totals(regular: ContributionTotals, special: ContributionTotals) -> ContributionTotals {
    let mut lines = regular.lines;
    for line in special.lines {
        match lines.iter_mut().find(|l| l.id == line.id) {
            Some(existing) => {
                existing.applies |= line.applies;
                existing.base += line.base;
                existing.employee += line.employee;
                existing.employer += line.employer;
            }
            None => lines.push(line),
        }
    }

    let mut merged = ContributionTotals::default();
    for line in lines {
        merged.push(line);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::document::RateBracket;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn scheme(employee_rate: Decimal) -> ContributionScheme {
        ContributionScheme {
            employee_rate,
            ..Default::default()
        }
    }

    #[test]
    fn test_ceiling_clamps_employee_amount() {
        let s = ContributionScheme {
            floor: Some(Decimal::ZERO),
            ceiling: Some(dec!(50000)),
            ..scheme(dec!(0.1))
        };
        let line = scheme_line("pension".into(), dec!(80000), &s, &ContributionOptions::default());
        assert_eq!(line.base, dec!(50000.00));
        assert_eq!(line.employee, dec!(5000.00));
    }

    #[test]
    fn test_base_stays_within_floor_and_ceiling() {
        let s = ContributionScheme {
            floor: Some(dec!(6000)),
            ceiling: Some(dec!(60000)),
            ..Default::default()
        };
        for gross in [dec!(1), dec!(5999), dec!(6000), dec!(42000), dec!(60000), dec!(1000000000)] {
            let base = effective_base(gross, &s, IncomePortion::Regular);
            assert!(base >= dec!(6000) && base <= dec!(60000), "{gross} -> {base}");
        }
        assert_eq!(effective_base(Decimal::ZERO, &s, IncomePortion::Regular), Decimal::ZERO);
    }

    #[test]
    fn test_special_ceiling_used_for_special_portion() {
        let s = ContributionScheme {
            ceiling: Some(dec!(70000)),
            special_ceiling: Some(dec!(14000)),
            ..Default::default()
        };
        assert_eq!(effective_base(dec!(20000), &s, IncomePortion::Special), dec!(14000));
        assert_eq!(effective_base(dec!(20000), &s, IncomePortion::Regular), dec!(20000));
    }

    #[test]
    fn test_non_applying_scheme_kept_as_zero_line() {
        let rules: ContributionRules = serde_json::from_value(json!({
            "health": {"employeeRate": 0.05, "employerRate": 0.06},
            "pension": {"employeeRate": 0.09, "applies": false}
        }))
        .unwrap();
        let totals = compute_annual(dec!(40000), &rules, &ContributionOptions::default());
        assert_eq!(totals.lines.len(), 2);
        let pension = &totals.lines[1];
        assert!(!pension.applies);
        assert_eq!(pension.employee, Decimal::ZERO);
        assert_eq!(totals.employee_total, dec!(2000.00));
        assert_eq!(totals.employer_total, dec!(2400.00));
    }

    #[test]
    fn test_bracketed_employee_schedule() {
        let s = ContributionScheme {
            bracketed_employee: vec![
                RateBracket { up_to: Some(dec!(12570)), rate: Decimal::ZERO },
                RateBracket { up_to: Some(dec!(50270)), rate: dec!(0.08) },
                RateBracket { up_to: None, rate: dec!(0.02) },
            ],
            employer_rate: dec!(0.15),
            employer_threshold: Some(dec!(5000)),
            ..Default::default()
        };
        let line = scheme_line("ni".into(), dec!(60000), &s, &ContributionOptions::default());
        // (50270 - 12570) * 0.08 + (60000 - 50270) * 0.02
        assert_eq!(line.employee, dec!(3210.60));
        assert_eq!(line.employer, dec!(8250.00));
    }

    #[test]
    fn test_low_income_tier_regular_portion_only() {
        let s = ContributionScheme {
            low_income_employee_tiers: vec![
                LowIncomeTier { from: Decimal::ZERO, up_to: dec!(2074), rate: Decimal::ZERO },
                LowIncomeTier { from: dec!(2074), up_to: dec!(2262), rate: dec!(0.01) },
            ],
            ..scheme(dec!(0.03))
        };
        let regular = ContributionOptions::default();
        // monthly 2074 sits on both edges: first match wins
        let line = scheme_line("unemployment".into(), dec!(24888), &s, &regular);
        assert_eq!(line.employee, dec!(0.00));

        let line = scheme_line("unemployment".into(), dec!(26400), &s, &regular);
        assert_eq!(line.employee, dec!(264.00));

        let special = ContributionOptions::special(RoundingPolicy::default());
        let line = scheme_line("unemployment".into(), dec!(4000), &s, &special);
        assert_eq!(line.employee, dec!(120.00));
    }

    #[test]
    fn test_tier_uses_pre_ceiling_gross() {
        let s = ContributionScheme {
            ceiling: Some(dec!(12000)),
            low_income_employee_tiers: vec![LowIncomeTier {
                from: Decimal::ZERO,
                up_to: dec!(1500),
                rate: Decimal::ZERO,
            }],
            ..scheme(dec!(0.05))
        };
        // base is capped at 12000 (1000/month) but monthly gross is 2000
        let line = scheme_line("x".into(), dec!(24000), &s, &ContributionOptions::default());
        assert_eq!(line.employee, dec!(600.00));
    }

    #[test]
    fn test_deductible_total_and_other_ids() {
        let rules: ContributionRules = serde_json::from_value(json!({
            "pension": {"employeeRate": 0.1, "deductibleForTax": true},
            "other": [{"employeeRate": 0.01}]
        }))
        .unwrap();
        let totals = compute_annual(dec!(10000), &rules, &ContributionOptions::default());
        assert_eq!(totals.deductible_employee_total, dec!(1000.00));
        assert_eq!(totals.employee_total, dec!(1100.00));
        assert_eq!(totals.lines[1].id, "other_0");
    }

    #[test]
    fn test_merge_totals_sums_per_scheme() {
        let rules: ContributionRules = serde_json::from_value(json!({
            "health": {"employeeRate": 0.05, "deductibleForTax": true}
        }))
        .unwrap();
        let policy = RoundingPolicy::default();
        let regular = compute_annual(dec!(36000), &rules, &ContributionOptions::regular(policy));
        let special = compute_annual(dec!(6000), &rules, &ContributionOptions::special(policy));
        let merged = merge_totals(regular, special);
        assert_eq!(merged.lines.len(), 1);
        assert_eq!(merged.lines[0].base, dec!(42000.00));
        assert_eq!(merged.employee_total, dec!(2100.00));
        assert_eq!(merged.deductible_employee_total, dec!(2100.00));
    }

    #[test]
    fn test_fractional_monthly_rounds_into_tier() {
        let s = ContributionScheme {
            low_income_employee_tiers: vec![
                LowIncomeTier { from: Decimal::ZERO, up_to: dec!(2074), rate: Decimal::ZERO },
                LowIncomeTier { from: dec!(2074.01), up_to: dec!(2262), rate: dec!(0.01) },
                LowIncomeTier { from: dec!(2262.01), up_to: dec!(2426), rate: dec!(0.02) },
            ],
            ..scheme(dec!(0.0295))
        };
        let opts = ContributionOptions::default();
        // 24888.09 / 12 = 2074.0075 -> 2074.01
        let line = scheme_line("unemployment".into(), dec!(24888.09), &s, &opts);
        assert_eq!(line.employee, dec!(248.88));
        // 27144.05 / 12 = 2262.004 -> 2262.00
        let line = scheme_line("unemployment".into(), dec!(27144.05), &s, &opts);
        assert_eq!(line.employee, dec!(271.44));
    }

    #[test]
    fn test_gap_between_tiers_uses_lower_tier() {
        let tiers = vec![
            LowIncomeTier { from: Decimal::ZERO, up_to: dec!(1000), rate: Decimal::ZERO },
            LowIncomeTier { from: dec!(1000.50), up_to: dec!(2000), rate: dec!(0.01) },
        ];
        assert_eq!(low_income_rate(&tiers, dec!(1000.25)), Some(Decimal::ZERO));
        assert_eq!(low_income_rate(&tiers, dec!(1000.50)), Some(dec!(0.01)));
        assert_eq!(low_income_rate(&tiers, dec!(2000.01)), None);
    }

    #[test]
    fn test_special_portion_skips_floor() {
        let s = ContributionScheme {
            floor: Some(dec!(5000)),
            ..scheme(dec!(0.1))
        };
        assert_eq!(effective_base(dec!(1000), &s, IncomePortion::Special), dec!(1000));
        assert_eq!(effective_base(dec!(1000), &s, IncomePortion::Regular), dec!(5000));
    }
}
