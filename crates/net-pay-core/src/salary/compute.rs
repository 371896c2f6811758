use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::context::{build_tax_context_from_repository, ContextOptions, ResolvedIncomeTax, TaxContext};
use crate::engine::contributions::{compute_annual, merge_totals, ContributionOptions};
use crate::engine::credits::apply_credits;
use crate::engine::formula::{FormulaContext, FormulaRegistry};
use crate::engine::income_tax::{compute_by_rules, compute_dual};
use crate::engine::other_taxes::{compute_other_taxes, TaxBases};
use crate::engine::special_payments::{
    apply_preferential, preferential_cap, salary_months, split_gross,
};
use crate::error::{ComputationError, NetPayError};
use crate::rules::document::TaxableIncomeRules;
use crate::rules::repository::RuleRepository;
use crate::salary::result::{Breakdown, RowTables, SalaryResult, SpecialPaymentSummary};
use crate::types::{Money, SalaryPeriod};

/// Upper bound on accepted salary amounts.
pub const MAX_SALARY_AMOUNT: Decimal = dec!(1000000000000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryInput {
    pub salary_amount: Money,
    #[serde(default)]
    pub salary_period: SalaryPeriod,
    /// Annual benefits in kind. Taxed and insured, but not paid out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits_annual: Option<Money>,
    /// Salaries per year, for jurisdictions with 13th/14th-month payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_months: Option<u32>,
}

impl SalaryInput {
    pub fn yearly(amount: Money) -> Self {
        Self {
            salary_amount: amount,
            salary_period: SalaryPeriod::Yearly,
            benefits_annual: None,
            salary_months: None,
        }
    }

    pub fn monthly(amount: Money) -> Self {
        Self {
            salary_period: SalaryPeriod::Monthly,
            ..Self::yearly(amount)
        }
    }
}

/// A serialized context plus the salary input, as sent by front ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalaryRequest {
    #[serde(default)]
    pub tax_context: Option<TaxContext>,
    #[serde(flatten)]
    pub input: SalaryInput,
}

/// Gross-to-net for one resolved context with the built-in formula methods.
pub fn compute_salary(
    ctx: &TaxContext,
    input: &SalaryInput,
) -> Result<SalaryResult, ComputationError> {
    compute_salary_with_registry(ctx, input, &FormulaRegistry::with_defaults())
}

pub fn compute_salary_request(request: &SalaryRequest) -> Result<SalaryResult, ComputationError> {
    let ctx = request
        .tax_context
        .as_ref()
        .ok_or(ComputationError::MissingTaxContext)?;
    compute_salary(ctx, &request.input)
}

/// Load rules, build the context and compute in one step.
pub async fn compute_salary_with_context(
    repository: &RuleRepository,
    options: &ContextOptions,
    input: &SalaryInput,
) -> Result<SalaryResult, NetPayError> {
    let ctx = build_tax_context_from_repository(repository, options).await?;
    Ok(compute_salary(&ctx, input)?)
}

pub fn compute_salary_with_registry(
    ctx: &TaxContext,
    input: &SalaryInput,
    registry: &FormulaRegistry,
) -> Result<SalaryResult, ComputationError> {
    // --- Validation ---
    validate(ctx, input)?;
    let income_tax_rules = ctx
        .income_tax()
        .ok_or_else(|| ComputationError::MissingIncomeTaxRules {
            country_code: ctx.country_code().to_string(),
            year: ctx.year(),
        })?;

    let policy = ctx.rounding();
    let benefits = input.benefits_annual.unwrap_or(Decimal::ZERO);
    let formula_ctx = FormulaContext {
        country_code: ctx.country_code(),
        tax_class: ctx.tax_class(),
        children_count: ctx.children_count(),
        year_rules: ctx.year_rules(),
    };

    // --- Annualize and split ---
    let special_rules = ctx.special_payments();
    let split = special_rules.and_then(|rules| {
        let months = salary_months(rules, input.salary_months);
        (months > rules.regular_months)
            .then(|| split_gross(input.salary_amount, input.salary_period, months, rules))
    });
    let (cash_regular, cash_special) = match &split {
        Some(split) => (split.regular_annual, split.special_annual),
        None => {
            let annual = match input.salary_period {
                SalaryPeriod::Yearly => input.salary_amount,
                SalaryPeriod::Monthly => input.salary_amount * dec!(12),
            };
            (annual, Decimal::ZERO)
        }
    };
    let regular_gross = cash_regular + benefits;
    let gross = regular_gross + cash_special;

    // --- Contributions ---
    let months_divisor = Decimal::from(special_rules.map_or(12, |r| r.regular_months.max(1)));
    let regular_contributions = compute_annual(
        regular_gross,
        ctx.contributions(),
        &ContributionOptions::regular(policy).months_divisor(months_divisor),
    );
    let special_contributions = split.as_ref().map(|_| {
        compute_annual(
            cash_special,
            ctx.contributions(),
            &ContributionOptions::special(policy),
        )
    });

    // --- Taxable income ---
    let allowances: Money = ctx.allowances().iter().map(|a| a.amount).sum();
    let mut taxable = match ctx.taxable_income() {
        Some(TaxableIncomeRules::ProfessionalExpense { rate, min, max }) => {
            let before_tax = regular_gross - regular_contributions.employee_total;
            let mut deduction = (before_tax * rate).max(*min);
            if let Some(max) = max {
                deduction = deduction.min(*max);
            }
            before_tax - deduction
        }
        None => regular_gross - regular_contributions.deductible_employee_total - allowances,
    }
    .max(Decimal::ZERO);

    let preferential = match (&split, &special_contributions, special_rules) {
        (Some(split), Some(special), Some(rules)) => {
            let special_taxable =
                (split.special_annual - special.deductible_employee_total).max(Decimal::ZERO);
            let cap = preferential_cap(split.regular_annual, rules.preferential_cap_divisor);
            let allocation = apply_preferential(special_taxable, cap, rules.allowance);
            taxable += allocation.excess;
            Some((special_taxable, allocation, rules))
        }
        _ => None,
    };
    let taxable = policy.round(taxable);

    // --- Income tax ---
    let regular_tax = match income_tax_rules {
        ResolvedIncomeTax::Single { rules } => {
            compute_by_rules(taxable, rules, &policy, registry, &formula_ctx)?
        }
        ResolvedIncomeTax::Dual {
            region,
            national,
            regional,
        } => compute_dual(taxable, region, national, regional, &policy, registry, &formula_ctx)?,
    };
    let special_summary = match (preferential, split) {
        (Some((special_taxable, allocation, rules)), Some(split)) => {
            let preferential_tax = compute_by_rules(
                allocation.preferential_base,
                &rules.preferential_tax,
                &policy,
                registry,
                &formula_ctx,
            )?;
            Some(SpecialPaymentSummary {
                split,
                special_taxable: policy.round(special_taxable),
                preferential: allocation,
                preferential_tax,
            })
        }
        _ => None,
    };
    let income_tax_before_credits = regular_tax.amount
        + special_summary
            .as_ref()
            .map_or(Decimal::ZERO, |s| s.preferential_tax.amount);

    // --- Credits ---
    let credits = apply_credits(taxable, income_tax_before_credits, ctx.tax_credits(), &policy);
    let income_tax = income_tax_before_credits - credits.applied;

    // --- Other taxes ---
    let contributions = match special_contributions {
        Some(special) => merge_totals(regular_contributions, special),
        None => regular_contributions,
    };
    let total_taxable = taxable
        + special_summary
            .as_ref()
            .map_or(Decimal::ZERO, |s| s.preferential.preferential_base);
    let bases = TaxBases {
        gross,
        taxable_income: total_taxable,
        income_tax,
    };
    let other_taxes = compute_other_taxes(&bases, ctx.other_taxes(), &policy);

    // --- Net and employer cost ---
    let net = gross
        - contributions.employee_total
        - income_tax
        - other_taxes.employee_total
        - benefits;
    let tco = gross + contributions.employer_total + other_taxes.employer_total;

    let annual = Breakdown {
        gross: policy.round(gross),
        benefits: policy.round(benefits),
        allowances: policy.round(allowances),
        taxable_income: policy.round(total_taxable),
        income_tax_before_credits,
        credits: credits.applied,
        income_tax,
        employee_other_taxes: other_taxes.employee_total,
        employer_other_taxes: other_taxes.employer_total,
        employee_contributions: contributions.employee_total,
        employer_contributions: contributions.employer_total,
        net: policy.round(net),
        tco: policy.round(tco),
    };
    let monthly = annual.monthly(&policy);
    let rows = RowTables::build(&annual, &monthly, &contributions, &other_taxes, &policy);

    tracing::debug!(
        calc_mode = %ctx.calc_mode(),
        gross = %annual.gross,
        net = %annual.net,
        tco = %annual.tco,
        "salary computed"
    );

    Ok(SalaryResult {
        country_code: ctx.country_code().to_string(),
        year: ctx.year(),
        currency: ctx.currency().to_string(),
        region: ctx.region().map(str::to_string),
        tax_class: ctx.tax_class().map(str::to_string),
        calc_mode: ctx.calc_mode().clone(),
        annual,
        monthly,
        contributions,
        other_taxes,
        credits,
        income_tax: regular_tax,
        special_payments: special_summary,
        rows,
        notes: ctx.notes().to_vec(),
        warnings: ctx.warnings().to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn validate(ctx: &TaxContext, input: &SalaryInput) -> Result<(), ComputationError> {
    if input.salary_amount < Decimal::ZERO {
        return Err(ComputationError::InvalidInput {
            field: "salaryAmount".into(),
            reason: "Salary cannot be negative".into(),
        });
    }
    if input.salary_amount >= MAX_SALARY_AMOUNT {
        return Err(ComputationError::InvalidInput {
            field: "salaryAmount".into(),
            reason: format!("Salary must be below {MAX_SALARY_AMOUNT}"),
        });
    }
    if let Some(benefits) = input.benefits_annual {
        if benefits < Decimal::ZERO {
            return Err(ComputationError::InvalidInput {
                field: "benefitsAnnual".into(),
                reason: "Benefits cannot be negative".into(),
            });
        }
        if benefits >= MAX_SALARY_AMOUNT {
            return Err(ComputationError::InvalidInput {
                field: "benefitsAnnual".into(),
                reason: format!("Benefits must be below {MAX_SALARY_AMOUNT}"),
            });
        }
    }
    if input.salary_months == Some(0) {
        return Err(ComputationError::InvalidInput {
            field: "salaryMonths".into(),
            reason: "Salary months must be at least 1".into(),
        });
    }
    if ctx.requires_tax_class() && ctx.tax_class().is_none() {
        return Err(ComputationError::MissingTaxClass {
            country_code: ctx.country_code().to_string(),
            year: ctx.year(),
        });
    }
    if !ctx
        .calc_mode()
        .matches(ctx.country_code(), ctx.year(), ctx.tax_class())
    {
        return Err(ComputationError::CalcModeMismatch {
            context: format!(
                "{}/{}/{}",
                ctx.country_code(),
                ctx.year(),
                ctx.tax_class().unwrap_or("-")
            ),
            calc_mode: ctx.calc_mode().to_string(),
        });
    }
    Ok(())
}
