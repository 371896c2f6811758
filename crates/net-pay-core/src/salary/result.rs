use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::context::CalcMode;
use crate::engine::contributions::ContributionTotals;
use crate::engine::credits::CreditSummary;
use crate::engine::income_tax::TaxComputation;
use crate::engine::other_taxes::OtherTaxTotals;
use crate::engine::special_payments::{PreferentialSplit, SalarySplit};
use crate::rules::document::Incidence;
use crate::types::{Money, RoundingPolicy};

const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Headline figures for one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakdown {
    /// Cash salary plus benefits in kind.
    pub gross: Money,
    pub benefits: Money,
    pub allowances: Money,
    pub taxable_income: Money,
    pub income_tax_before_credits: Money,
    pub credits: Money,
    pub income_tax: Money,
    pub employee_other_taxes: Money,
    pub employer_other_taxes: Money,
    pub employee_contributions: Money,
    pub employer_contributions: Money,
    pub net: Money,
    pub tco: Money,
}

impl Breakdown {
    /// Every field divided by twelve and rounded.
    pub fn monthly(&self, policy: &RoundingPolicy) -> Breakdown {
        let m = |v: Money| policy.round(v / MONTHS_PER_YEAR);
        Breakdown {
            gross: m(self.gross),
            benefits: m(self.benefits),
            allowances: m(self.allowances),
            taxable_income: m(self.taxable_income),
            income_tax_before_credits: m(self.income_tax_before_credits),
            credits: m(self.credits),
            income_tax: m(self.income_tax),
            employee_other_taxes: m(self.employee_other_taxes),
            employer_other_taxes: m(self.employer_other_taxes),
            employee_contributions: m(self.employee_contributions),
            employer_contributions: m(self.employer_contributions),
            net: m(self.net),
            tco: m(self.tco),
        }
    }
}

/// Regular/special split of a salary paid over more than twelve months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialPaymentSummary {
    pub split: SalarySplit,
    pub special_taxable: Money,
    pub preferential: PreferentialSplit,
    pub preferential_tax: TaxComputation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub key: String,
    pub label: String,
    pub annual: Money,
    pub monthly: Money,
}

/// Display rows for the employee and employer views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowTables {
    pub employee: Vec<Row>,
    pub employer: Vec<Row>,
}

impl RowTables {
    pub(crate) fn build(
        annual: &Breakdown,
        monthly: &Breakdown,
        contributions: &ContributionTotals,
        other_taxes: &OtherTaxTotals,
        policy: &RoundingPolicy,
    ) -> Self {
        let row = |key: &str, label: &str, annual: Money, monthly: Money| Row {
            key: key.to_string(),
            label: label.to_string(),
            annual,
            monthly,
        };
        let derived = |key: String, label: String, annual: Money| Row {
            key,
            label,
            annual,
            monthly: policy.round(annual / MONTHS_PER_YEAR),
        };

        let mut employee = vec![row("gross", "Gross salary", annual.gross, monthly.gross)];
        if annual.benefits > Decimal::ZERO {
            employee.push(row("benefits", "Benefits in kind", annual.benefits, monthly.benefits));
        }
        for line in &contributions.lines {
            let label = line.label.clone().unwrap_or_else(|| line.id.clone());
            employee.push(derived(format!("contribution.{}", line.id), label, line.employee));
        }
        employee.push(row("income_tax", "Income tax", annual.income_tax, monthly.income_tax));
        for line in other_taxes.lines.iter().filter(|l| l.incidence == Incidence::Employee) {
            let label = line.label.clone().unwrap_or_else(|| line.id.clone());
            employee.push(derived(format!("other_tax.{}", line.id), label, line.amount));
        }
        employee.push(row("net", "Net salary", annual.net, monthly.net));

        let mut employer = vec![row("gross", "Gross salary", annual.gross, monthly.gross)];
        for line in &contributions.lines {
            let label = line.label.clone().unwrap_or_else(|| line.id.clone());
            employer.push(derived(format!("contribution.{}", line.id), label, line.employer));
        }
        for line in other_taxes.lines.iter().filter(|l| l.incidence == Incidence::Employer) {
            let label = line.label.clone().unwrap_or_else(|| line.id.clone());
            employer.push(derived(format!("other_tax.{}", line.id), label, line.amount));
        }
        employer.push(row("tco", "Total cost to employer", annual.tco, monthly.tco));

        Self { employee, employer }
    }
}

/// Complete output of one salary computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryResult {
    pub country_code: String,
    pub year: i32,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_class: Option<String>,
    pub calc_mode: CalcMode,
    pub annual: Breakdown,
    pub monthly: Breakdown,
    pub contributions: ContributionTotals,
    pub other_taxes: OtherTaxTotals,
    pub credits: CreditSummary,
    pub income_tax: TaxComputation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_payments: Option<SpecialPaymentSummary>,
    pub rows: RowTables,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_divides_and_rounds() {
        let annual = Breakdown {
            gross: dec!(50000),
            net: dec!(33333.33),
            tco: dec!(60500),
            ..Default::default()
        };
        let monthly = annual.monthly(&RoundingPolicy::default());
        assert_eq!(monthly.gross, dec!(4166.67));
        assert_eq!(monthly.net, dec!(2777.78));
        assert_eq!(monthly.tco, dec!(5041.67));
        assert_eq!(monthly.income_tax, dec!(0.00));
    }
}
