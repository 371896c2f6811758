pub mod document;
pub mod lint;
pub mod merge;
pub mod repository;

pub use document::{CountryRuleDocument, YearRules};
pub use lint::{lint_document, TaxClassDiagnostic};
pub use merge::deep_merge;
pub use repository::RuleRepository;
