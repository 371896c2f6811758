pub mod compute;
pub mod result;

pub use compute::{
    compute_salary, compute_salary_request, compute_salary_with_context,
    compute_salary_with_registry, SalaryInput, SalaryRequest,
};
pub use result::{Breakdown, Row, RowTables, SalaryResult};
