pub mod calc_mode;
pub mod resolver;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::Diagnostics;
use crate::rules::document::{
    Allowance, CalculationFlags, ContributionRules, IncomeTaxRules, OtherTaxRule,
    SpecialPaymentRules, TaxCredit, TaxableIncomeRules, YearRules,
};
use crate::types::RoundingPolicy;

pub use calc_mode::CalcMode;
pub use resolver::{build_tax_context, build_tax_context_from_repository, resolve_year_rules};

/// Income-tax rules after class and region resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolvedIncomeTax {
    Single {
        rules: IncomeTaxRules,
    },
    Dual {
        region: String,
        national: IncomeTaxRules,
        regional: IncomeTaxRules,
    },
}

/// User selections for one context build.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextOptions {
    pub country_code: String,
    pub year: i32,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub tax_class: Option<String>,
    #[serde(default)]
    pub children_count: u32,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl ContextOptions {
    pub fn new(country_code: impl Into<String>, year: i32) -> Self {
        Self {
            country_code: country_code.into(),
            year,
            ..Default::default()
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn tax_class(mut self, tax_class: impl Into<String>) -> Self {
        self.tax_class = Some(tax_class.into());
        self
    }

    pub fn children(mut self, count: u32) -> Self {
        self.children_count = count;
        self
    }

    pub fn diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Fully resolved, read-only snapshot of everything one computation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxContext {
    country_code: String,
    country_name: String,
    currency: String,
    year: i32,
    region: Option<String>,
    tax_class: Option<String>,
    children_count: u32,
    requires_tax_class: bool,
    income_tax: Option<ResolvedIncomeTax>,
    contributions: ContributionRules,
    other_taxes: BTreeMap<String, OtherTaxRule>,
    calculation: CalculationFlags,
    allowances: Vec<Allowance>,
    tax_credits: Vec<TaxCredit>,
    taxable_income: Option<TaxableIncomeRules>,
    special_payments: Option<SpecialPaymentRules>,
    year_rules: YearRules,
    notes: Vec<String>,
    warnings: Vec<String>,
    calc_mode: CalcMode,
}

impl TaxContext {
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    pub fn country_name(&self) -> &str {
        &self.country_name
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn tax_class(&self) -> Option<&str> {
        self.tax_class.as_deref()
    }

    pub fn children_count(&self) -> u32 {
        self.children_count
    }

    pub fn requires_tax_class(&self) -> bool {
        self.requires_tax_class
    }

    pub fn income_tax(&self) -> Option<&ResolvedIncomeTax> {
        self.income_tax.as_ref()
    }

    pub fn contributions(&self) -> &ContributionRules {
        &self.contributions
    }

    pub fn other_taxes(&self) -> &BTreeMap<String, OtherTaxRule> {
        &self.other_taxes
    }

    pub fn calculation(&self) -> &CalculationFlags {
        &self.calculation
    }

    pub fn rounding(&self) -> RoundingPolicy {
        self.calculation.policy()
    }

    /// Allowances for the resolved schedule: the year's top-level block for
    /// dual schedules, the income-tax block otherwise.
    pub fn allowances(&self) -> &[Allowance] {
        match &self.income_tax {
            Some(ResolvedIncomeTax::Single { rules }) => &rules.allowances,
            _ => &self.allowances,
        }
    }

    pub fn tax_credits(&self) -> &[TaxCredit] {
        &self.tax_credits
    }

    pub fn taxable_income(&self) -> Option<&TaxableIncomeRules> {
        self.taxable_income.as_ref()
    }

    pub fn special_payments(&self) -> Option<&SpecialPaymentRules> {
        self.special_payments.as_ref()
    }

    /// Unmerged year rules, handed to formula strategies.
    pub fn year_rules(&self) -> &YearRules {
        &self.year_rules
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn calc_mode(&self) -> &CalcMode {
        &self.calc_mode
    }
}
