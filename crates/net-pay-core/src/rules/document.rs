use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Money, Rate, RoundingMode, RoundingPolicy};

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One country's rule document: every supported tax year keyed by year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRuleDocument {
    #[serde(default)]
    pub country_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<NaiveDate>,
    pub years: BTreeMap<String, YearRules>,
}

impl CountryRuleDocument {
    pub fn year(&self, year: i32) -> Option<&YearRules> {
        self.years.get(&year.to_string())
    }

    /// Year keys that parse as integers, ascending.
    pub fn available_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.years.keys().filter_map(|k| k.parse().ok()).collect();
        years.sort_unstable();
        years
    }
}

/// The rule subtree for one country and one tax year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_tax: Option<IncomeTaxRules>,
    /// National + regional schedules, keyed by region.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regions: BTreeMap<String, RegionIncomeTax>,
    #[serde(default)]
    pub social_contributions: ContributionRules,
    #[serde(default)]
    pub other_taxes: BTreeMap<String, OtherTaxRule>,
    #[serde(default)]
    pub calculation: CalculationFlags,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tax_classes: BTreeMap<String, TaxClassOverride>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_payments: Option<SpecialPaymentRules>,
    /// Top-level allowance block, used by dual-schedule jurisdictions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowances: Vec<Allowance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tax_credits: Vec<TaxCredit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxable_income: Option<TaxableIncomeRules>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disclaimers: Vec<String>,
}

impl YearRules {
    pub fn uses_dual_schedule(&self) -> bool {
        !self.regions.is_empty()
    }

    pub fn requires_tax_class(&self) -> bool {
        !self.tax_classes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationFlags {
    #[serde(default)]
    pub rounding_mode: RoundingMode,
    #[serde(default = "default_decimals")]
    pub currency_decimals: u32,
}

fn default_decimals() -> u32 {
    2
}

impl Default for CalculationFlags {
    fn default() -> Self {
        Self {
            rounding_mode: RoundingMode::NearestCent,
            currency_decimals: default_decimals(),
        }
    }
}

impl CalculationFlags {
    pub fn policy(&self) -> RoundingPolicy {
        RoundingPolicy::new(self.rounding_mode, self.currency_decimals)
    }
}

// ---------------------------------------------------------------------------
// Income tax
// ---------------------------------------------------------------------------

/// One rung of a progressive ladder. A missing `up_to` is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateBracket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to: Option<Money>,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allowance {
    pub name: String,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeTaxRules {
    #[serde(flatten)]
    pub schedule: TaxSchedule,
    /// Nested allowance block for single-schedule jurisdictions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowances: Vec<Allowance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxSchedule {
    Progressive {
        brackets: Vec<RateBracket>,
    },
    Flat {
        rate: Rate,
    },
    #[serde(rename_all = "camelCase")]
    Formula {
        #[serde(default)]
        use_formula: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        method: Option<String>,
        #[serde(default)]
        parameters: Map<String, Value>,
    },
}

impl IncomeTaxRules {
    pub fn progressive(brackets: Vec<RateBracket>) -> Self {
        Self {
            schedule: TaxSchedule::Progressive { brackets },
            allowances: Vec::new(),
        }
    }

    pub fn flat(rate: Rate) -> Self {
        Self {
            schedule: TaxSchedule::Flat { rate },
            allowances: Vec::new(),
        }
    }

    /// `progressive`, `flat`, or the formula method name.
    pub fn method_name(&self) -> String {
        match &self.schedule {
            TaxSchedule::Progressive { .. } => "progressive".into(),
            TaxSchedule::Flat { .. } => "flat".into(),
            TaxSchedule::Formula { method, .. } => {
                method.clone().unwrap_or_else(|| "formula".into())
            }
        }
    }
}

/// A national + regional schedule pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionIncomeTax {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub national: IncomeTaxRules,
    pub regional: IncomeTaxRules,
}

/// Partial fragments deep-merged onto the year's base rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxClassOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub income_tax: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_contributions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_taxes: Option<Value>,
    /// Injected into formula parameters as `taxableIncomeAdjustment`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxable_income_adjustment: Option<Money>,
}

/// Taxable income modelled as net-before-tax minus a professional-expense
/// deduction clamped to `[min, max]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TaxableIncomeRules {
    ProfessionalExpense {
        rate: Rate,
        #[serde(default)]
        min: Money,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<Money>,
    },
}

// ---------------------------------------------------------------------------
// Social contributions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowIncomeTier {
    /// Inclusive lower edge, monthly.
    #[serde(default)]
    pub from: Money,
    /// Inclusive upper edge, monthly.
    pub up_to: Money,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionScheme {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub applies: bool,
    #[serde(default)]
    pub employee_rate: Rate,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bracketed_employee: Vec<RateBracket>,
    #[serde(default)]
    pub employer_rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employer_threshold: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub floor: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ceiling: Option<Money>,
    /// Annual ceiling applied to 13th/14th-month payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub special_ceiling: Option<Money>,
    #[serde(default)]
    pub deductible_for_tax: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub low_income_employee_tiers: Vec<LowIncomeTier>,
}

impl Default for ContributionScheme {
    fn default() -> Self {
        Self {
            id: None,
            label: None,
            applies: true,
            employee_rate: Decimal::ZERO,
            bracketed_employee: Vec::new(),
            employer_rate: Decimal::ZERO,
            employer_threshold: None,
            floor: None,
            ceiling: None,
            special_ceiling: None,
            deductible_for_tax: false,
            low_income_employee_tiers: Vec::new(),
        }
    }
}

/// Named schemes (`health`, `pension`, ...) plus an `other` list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionRules {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub other: Vec<ContributionScheme>,
    #[serde(flatten)]
    pub schemes: BTreeMap<String, ContributionScheme>,
}

impl ContributionRules {
    /// Every scheme with its output id, named schemes first.
    pub fn iter_with_ids(&self) -> impl Iterator<Item = (String, &ContributionScheme)> {
        let named = self.schemes.iter().map(|(k, s)| (k.clone(), s));
        let other = self.other.iter().enumerate().map(|(i, s)| {
            let id = s.id.clone().unwrap_or_else(|| format!("other_{i}"));
            (id, s)
        });
        named.chain(other)
    }
}

// ---------------------------------------------------------------------------
// Other taxes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxBasis {
    #[default]
    Gross,
    TaxableIncome,
    IncomeTax,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdKind {
    /// Rate applies to the excess over the threshold.
    #[default]
    Allowance,
    /// Nothing is due up to the threshold; above it the full basis is taxed.
    ExemptionLimit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Incidence {
    #[default]
    Employee,
    Employer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherTaxRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default = "default_true")]
    pub applies: bool,
    #[serde(default)]
    pub basis: TaxBasis,
    pub rate: Rate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<Money>,
    #[serde(default)]
    pub threshold_kind: ThresholdKind,
    /// Marginal rate on the excess over an exemption limit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taper_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<Money>,
    #[serde(default)]
    pub incidence: Incidence,
}

// ---------------------------------------------------------------------------
// Credits
// ---------------------------------------------------------------------------

/// `base + rate * (income - over)` for income up to `up_to`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditTier {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_to: Option<Money>,
    #[serde(default)]
    pub base: Money,
    #[serde(default)]
    pub rate: Rate,
    #[serde(default)]
    pub over: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaxCredit {
    #[serde(rename_all = "camelCase")]
    PhaseOut {
        name: String,
        max: Money,
        phaseout_start: Money,
        phaseout_end: Money,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rate: Option<Rate>,
    },
    Segmented {
        name: String,
        tiers: Vec<CreditTier>,
    },
}

impl TaxCredit {
    pub fn name(&self) -> &str {
        match self {
            TaxCredit::PhaseOut { name, .. } | TaxCredit::Segmented { name, .. } => name,
        }
    }
}

// ---------------------------------------------------------------------------
// Special payments (13th/14th salary)
// ---------------------------------------------------------------------------

fn default_regular_months() -> u32 {
    12
}

fn default_max_salary_months() -> u32 {
    14
}

fn default_cap_divisor() -> Decimal {
    dec!(6)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialPaymentRules {
    #[serde(default = "default_regular_months")]
    pub regular_months: u32,
    #[serde(default = "default_max_salary_months")]
    pub max_salary_months: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_salary_months: Option<u32>,
    #[serde(default = "default_cap_divisor")]
    pub preferential_cap_divisor: Decimal,
    /// Fixed allowance deducted from the capped special portion.
    #[serde(default)]
    pub allowance: Money,
    pub preferential_tax: IncomeTaxRules,
}
