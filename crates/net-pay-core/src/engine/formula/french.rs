use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{FormulaError, FormulaInput};
use crate::engine::brackets::span_sum;
use crate::rules::document::RateBracket;
use crate::types::Money;

/// Household parts: half a part for each of the first two children, a full
/// part for every further child.
pub fn household_parts(base_parts: Decimal, children: u32) -> Decimal {
    let first = Decimal::from(children.min(2)) * dec!(0.5);
    let further = Decimal::from(children.saturating_sub(2));
    base_parts + first + further
}

fn tax_for_parts(income: Money, parts: Decimal, brackets: &[RateBracket]) -> Money {
    if parts <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    span_sum(income / parts, brackets).0 * parts
}

/// Family-quotient tariff. The saving from children's parts is capped at
/// `halfPartCap` per extra half part.
pub fn family_quotient(input: &FormulaInput<'_>) -> Result<Decimal, FormulaError> {
    let params = input.params();
    let brackets: Vec<RateBracket> = params.typed("brackets")?;
    let base_parts = params.decimal_or("baseParts", Decimal::ONE)?;
    if base_parts <= Decimal::ZERO {
        return Err(FormulaError::InvalidParameters(
            "'baseParts' must be positive".into(),
        ));
    }
    let half_part_cap = params.opt_decimal("halfPartCap")?;

    let x = input.taxable_income.max(Decimal::ZERO);
    let parts = household_parts(base_parts, input.context.children_count);
    let with_children = tax_for_parts(x, parts, &brackets);

    let tax = match half_part_cap {
        Some(cap) if parts > base_parts => {
            let without_children = tax_for_parts(x, base_parts, &brackets);
            let extra_half_parts = (parts - base_parts) * dec!(2);
            let max_saving = cap * extra_half_parts;
            with_children.max(without_children - max_saving)
        }
        _ => with_children,
    };
    Ok(tax.max(Decimal::ZERO))
}
