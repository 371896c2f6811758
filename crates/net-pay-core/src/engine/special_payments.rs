//! 13th/14th-month salaries.
//!
//! The salary is split into a regular part (the first `regularMonths`
//! monthly salaries) and a special part. The special part's taxable amount
//! is taxed under the preferential schedule up to one sixth of the regular
//! annual gross; anything above that cap moves back into the regular base.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::document::SpecialPaymentRules;
use crate::types::{Money, SalaryPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalarySplit {
    pub salary_months: u32,
    pub monthly: Money,
    pub regular_annual: Money,
    pub special_annual: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferentialSplit {
    pub cap: Money,
    /// Special taxable income within the cap.
    pub capped: Money,
    /// Special taxable income above the cap, taxed as regular income.
    pub excess: Money,
    /// `capped` less the fixed allowance.
    pub preferential_base: Money,
}

/// Salary months in effect: the request, else the rules' default, limited
/// to `[regularMonths, maxSalaryMonths]`.
pub fn salary_months(rules: &SpecialPaymentRules, requested: Option<u32>) -> u32 {
    let months = requested
        .or(rules.default_salary_months)
        .unwrap_or(rules.regular_months);
    months
        .min(rules.max_salary_months)
        .max(rules.regular_months)
}

/// Split a salary into regular and special annual parts.
///
/// Yearly amounts are averaged over `months`; monthly amounts are multiplied
/// out directly.
pub fn split_gross(
    amount: Money,
    period: SalaryPeriod,
    months: u32,
    rules: &SpecialPaymentRules,
) -> SalarySplit {
    let regular_months = Decimal::from(rules.regular_months.min(months));
    let monthly = match period {
        SalaryPeriod::Monthly => amount,
        SalaryPeriod::Yearly if months > 0 => amount / Decimal::from(months),
        SalaryPeriod::Yearly => Decimal::ZERO,
    };
    let regular_annual = monthly * regular_months;
    let special_annual = match period {
        SalaryPeriod::Monthly => monthly * Decimal::from(months) - regular_annual,
        SalaryPeriod::Yearly => amount - regular_annual,
    }
    .max(Decimal::ZERO);

    SalarySplit {
        salary_months: months,
        monthly,
        regular_annual,
        special_annual,
    }
}

/// Regular annual gross divided by the rules' divisor (one sixth).
pub fn preferential_cap(regular_annual: Money, divisor: Decimal) -> Money {
    if divisor <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (regular_annual / divisor).max(Decimal::ZERO)
}

pub fn apply_preferential(special_taxable: Money, cap: Money, allowance: Money) -> PreferentialSplit {
    let special_taxable = special_taxable.max(Decimal::ZERO);
    let capped = special_taxable.min(cap);
    PreferentialSplit {
        cap,
        capped,
        excess: special_taxable - capped,
        preferential_base: (capped - allowance).max(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::document::IncomeTaxRules;
    use rust_decimal_macros::dec;

    fn rules() -> SpecialPaymentRules {
        SpecialPaymentRules {
            regular_months: 12,
            max_salary_months: 14,
            default_salary_months: Some(14),
            preferential_cap_divisor: dec!(6),
            allowance: dec!(620),
            preferential_tax: IncomeTaxRules::flat(dec!(0.06)),
        }
    }

    #[test]
    fn test_monthly_split_and_cap() {
        let split = split_gross(dec!(3000), SalaryPeriod::Monthly, 14, &rules());
        assert_eq!(split.regular_annual, dec!(36000));
        assert_eq!(split.special_annual, dec!(6000));
        assert_eq!(preferential_cap(split.regular_annual, dec!(6)), dec!(6000));
    }

    #[test]
    fn test_yearly_amount_averaged() {
        let split = split_gross(dec!(42000), SalaryPeriod::Yearly, 14, &rules());
        assert_eq!(split.monthly, dec!(3000));
        assert_eq!(split.regular_annual, dec!(36000));
        assert_eq!(split.special_annual, dec!(6000));
    }

    #[test]
    fn test_months_clamped() {
        let r = rules();
        assert_eq!(salary_months(&r, None), 14);
        assert_eq!(salary_months(&r, Some(16)), 14);
        assert_eq!(salary_months(&r, Some(10)), 12);
        assert_eq!(salary_months(&r, Some(13)), 13);
    }

    #[test]
    fn test_excess_over_cap_moves_to_regular() {
        let split = apply_preferential(dec!(7000), dec!(6000), dec!(620));
        assert_eq!(split.capped, dec!(6000));
        assert_eq!(split.excess, dec!(1000));
        assert_eq!(split.preferential_base, dec!(5380));

        let small = apply_preferential(dec!(500), dec!(6000), dec!(620));
        assert_eq!(small.excess, Decimal::ZERO);
        assert_eq!(small.preferential_base, Decimal::ZERO);
    }
}
