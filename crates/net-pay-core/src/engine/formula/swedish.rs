use rust_decimal::Decimal;

use super::{FormulaError, FormulaInput};
use crate::engine::credits::segmented_amount;
use crate::rules::document::CreditTier;

/// Municipal tax on the whole income, state tax above a threshold, less the
/// municipal-rate value of the earned-income credit from `creditSegments`.
pub fn municipal_state_credit(input: &FormulaInput<'_>) -> Result<Decimal, FormulaError> {
    let params = input.params();
    let municipal_rate = params.decimal("municipalRate")?;
    let state_rate = params.decimal_or("stateRate", Decimal::ZERO)?;
    let state_threshold = params.decimal_or("stateThreshold", Decimal::ZERO)?;
    let segments: Vec<CreditTier> = if input.parameters.contains_key("creditSegments") {
        params.typed("creditSegments")?
    } else {
        Vec::new()
    };

    let x = input.taxable_income.max(Decimal::ZERO);
    let municipal = municipal_rate * x;
    let state = state_rate * (x - state_threshold).max(Decimal::ZERO);
    let credit = municipal_rate * segmented_amount(x, &segments);

    Ok((municipal + state - credit).max(Decimal::ZERO))
}
