use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// How finalized amounts are rounded to the currency's minor unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    #[default]
    NearestCent,
    Up,
    Down,
}

/// Rounding mode plus the number of currency decimals it applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundingPolicy {
    pub mode: RoundingMode,
    pub decimals: u32,
}

impl Default for RoundingPolicy {
    fn default() -> Self {
        Self {
            mode: RoundingMode::NearestCent,
            decimals: 2,
        }
    }
}

impl RoundingPolicy {
    pub fn new(mode: RoundingMode, decimals: u32) -> Self {
        Self { mode, decimals }
    }

    /// Round a finalized amount. Never call this on intermediate bracket sums.
    pub fn round(&self, value: Money) -> Money {
        let strategy = match self.mode {
            RoundingMode::NearestCent => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::Up => RoundingStrategy::AwayFromZero,
            RoundingMode::Down => RoundingStrategy::ToZero,
        };
        let mut rounded = value.round_dp_with_strategy(self.decimals, strategy);
        rounded.rescale(self.decimals);
        rounded
    }
}

/// Period the user's salary figure refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryPeriod {
    Monthly,
    #[default]
    Yearly,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_nearest_cent_rounds_half_away_from_zero() {
        let policy = RoundingPolicy::default();
        assert_eq!(policy.round(dec!(10.005)), dec!(10.01));
        assert_eq!(policy.round(dec!(10.004)), dec!(10.00));
    }

    #[test]
    fn test_up_and_down_modes() {
        let up = RoundingPolicy::new(RoundingMode::Up, 2);
        let down = RoundingPolicy::new(RoundingMode::Down, 2);
        assert_eq!(up.round(dec!(10.001)), dec!(10.01));
        assert_eq!(down.round(dec!(10.009)), dec!(10.00));
    }

    #[test]
    fn test_round_pads_to_currency_scale() {
        let policy = RoundingPolicy::default();
        assert_eq!(policy.round(dec!(7967)).to_string(), "7967.00");
    }

    #[test]
    fn test_zero_decimal_currency() {
        let policy = RoundingPolicy::new(RoundingMode::NearestCent, 0);
        assert_eq!(policy.round(dec!(1234.5)), dec!(1235));
    }
}
