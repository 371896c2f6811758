use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::{FormulaError, FormulaInput, Params};
use crate::types::Money;

const ZONE_SCALE: Decimal = dec!(10000);

/// Parsed zone coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tariff {
    basic_allowance: Money,
    zone2_up_to: Money,
    zone2_a: Decimal,
    zone2_b: Decimal,
    zone3_up_to: Money,
    zone3_a: Decimal,
    zone3_b: Decimal,
    zone3_c: Decimal,
    zone4_up_to: Money,
    zone4_rate: Decimal,
    zone4_deduction: Money,
    zone5_rate: Decimal,
    zone5_deduction: Money,
}

impl Tariff {
    fn parse(params: &Params<'_>) -> Result<Self, FormulaError> {
        let zone2 = params.object("zone2")?;
        let zone3 = params.object("zone3")?;
        let zone4 = params.object("zone4")?;
        let zone5 = params.object("zone5")?;
        let tariff = Self {
            basic_allowance: params.decimal("basicAllowance")?,
            zone2_up_to: zone2.decimal("upTo")?,
            zone2_a: zone2.decimal("a")?,
            zone2_b: zone2.decimal("b")?,
            zone3_up_to: zone3.decimal("upTo")?,
            zone3_a: zone3.decimal("a")?,
            zone3_b: zone3.decimal("b")?,
            zone3_c: zone3.decimal("c")?,
            zone4_up_to: zone4.decimal("upTo")?,
            zone4_rate: zone4.decimal("rate")?,
            zone4_deduction: zone4.decimal("deduction")?,
            zone5_rate: zone5.decimal("rate")?,
            zone5_deduction: zone5.decimal("deduction")?,
        };
        if tariff.basic_allowance > tariff.zone2_up_to
            || tariff.zone2_up_to > tariff.zone3_up_to
            || tariff.zone3_up_to > tariff.zone4_up_to
        {
            return Err(FormulaError::InvalidParameters(
                "zone limits must ascend".into(),
            ));
        }
        Ok(tariff)
    }

    /// Tax on whole-unit income `x`, floored to whole units.
    fn tax(&self, x: Money) -> Money {
        let x = x.floor();
        let raw = if x <= self.basic_allowance {
            Decimal::ZERO
        } else if x <= self.zone2_up_to {
            let y = (x - self.basic_allowance) / ZONE_SCALE;
            (self.zone2_a * y + self.zone2_b) * y
        } else if x <= self.zone3_up_to {
            let z = (x - self.zone2_up_to) / ZONE_SCALE;
            (self.zone3_a * z + self.zone3_b) * z + self.zone3_c
        } else if x <= self.zone4_up_to {
            self.zone4_rate * x - self.zone4_deduction
        } else {
            self.zone5_rate * x - self.zone5_deduction
        };
        raw.floor().max(Decimal::ZERO)
    }
}

/// Zoned tariff on taxable income less any class adjustment.
///
/// With `splitting` the tariff of half the income is doubled. Classes listed
/// in `minimumRateClasses` pay at least `minimumRate` of the income.
pub fn zoned_tariff(input: &FormulaInput<'_>) -> Result<Decimal, FormulaError> {
    let params = input.params();
    let tariff = Tariff::parse(&params)?;
    let adjustment = params.decimal_or("taxableIncomeAdjustment", Decimal::ZERO)?;
    let x = (input.taxable_income - adjustment).max(Decimal::ZERO).floor();

    let zoned = if params.flag("splitting")? {
        tariff.tax((x / dec!(2)).floor()) * dec!(2)
    } else {
        tariff.tax(x)
    };

    let minimum_applies = match input.context.tax_class {
        Some(class) => params
            .strings("minimumRateClasses")?
            .iter()
            .any(|c| c.eq_ignore_ascii_case(class)),
        None => false,
    };
    if minimum_applies {
        if let Some(rate) = params.opt_decimal("minimumRate")? {
            return Ok(zoned.max((x * rate).floor()));
        }
    }
    Ok(zoned)
}
