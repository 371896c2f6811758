pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod rules;
pub mod salary;
pub mod types;

pub use config::{Diagnostics, EngineConfig, RuleSource};
pub use context::{
    build_tax_context, build_tax_context_from_repository, CalcMode, ContextOptions, TaxContext,
};
pub use engine::formula::{FormulaMethod, FormulaRegistry};
pub use error::{ComputationError, NetPayError, RuleError};
pub use rules::{deep_merge, lint_document, CountryRuleDocument, RuleRepository};
pub use salary::{
    compute_salary, compute_salary_request, compute_salary_with_context, SalaryInput,
    SalaryRequest, SalaryResult,
};
pub use types::*;

/// Standard result type for all net-pay operations
pub type NetPayResult<T> = Result<T, NetPayError>;
