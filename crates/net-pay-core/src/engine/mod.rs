pub mod brackets;
pub mod contributions;
pub mod credits;
pub mod formula;
pub mod income_tax;
pub mod other_taxes;
pub mod special_payments;

pub use contributions::{compute_annual, merge_totals, ContributionOptions, ContributionTotals};
pub use formula::{FormulaMethod, FormulaRegistry};
pub use income_tax::{compute_by_rules, compute_dual, TaxComputation};
