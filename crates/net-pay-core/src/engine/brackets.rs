use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::rules::document::RateBracket;
use crate::types::{Money, Rate};

/// The part of an amount that fell into one bracket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketSlice {
    pub lower: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upper: Option<Money>,
    pub rate: Rate,
    pub taxed: Money,
    pub amount: Money,
}

/// Brackets ordered by `up_to`, unbounded ones last.
pub fn sorted(brackets: &[RateBracket]) -> Vec<&RateBracket> {
    let mut ordered: Vec<&RateBracket> = brackets.iter().collect();
    ordered.sort_by(|a, b| match (a.up_to, b.up_to) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    ordered
}

/// Unrounded span-sum of `amount` over the ladder, with one slice per
/// bracket that received income.
///
/// Each bracket covers `(previous up_to, up_to]`. When every bracket is
/// bounded, income above the last edge is taxed at the last rate.
pub fn span_sum(amount: Money, brackets: &[RateBracket]) -> (Money, Vec<BracketSlice>) {
    let mut slices = Vec::new();
    if amount <= Decimal::ZERO || brackets.is_empty() {
        return (Decimal::ZERO, slices);
    }

    let ordered = sorted(brackets);
    let last = ordered.len() - 1;
    let mut lower = Decimal::ZERO;
    let mut total = Decimal::ZERO;

    for (i, bracket) in ordered.iter().enumerate() {
        let upper = if i == last { None } else { bracket.up_to };
        let top = match upper {
            Some(edge) => amount.min(edge),
            None => amount,
        };
        let taxed = (top - lower).max(Decimal::ZERO);
        if taxed > Decimal::ZERO {
            let tax = taxed * bracket.rate;
            total += tax;
            slices.push(BracketSlice {
                lower,
                upper,
                rate: bracket.rate,
                taxed,
                amount: tax,
            });
        }
        match upper {
            Some(edge) if edge > lower => lower = edge,
            Some(_) => {}
            None => break,
        }
        if amount <= lower {
            break;
        }
    }

    (total, slices)
}
