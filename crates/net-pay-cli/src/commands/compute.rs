use std::time::Instant;

use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use net_pay_core::types::{with_metadata, SalaryPeriod};
use net_pay_core::{compute_salary_with_context, ContextOptions, EngineConfig, RuleRepository, SalaryInput};

use super::{elapsed_us, ContextSelection};
use crate::input;

/// Arguments for a gross-to-net computation
#[derive(Args)]
pub struct ComputeArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    #[command(flatten)]
    pub selection: ContextSelection,

    /// Gross salary amount
    #[arg(long)]
    pub amount: Option<Decimal>,

    /// Period the amount refers to
    #[arg(long, value_enum, default_value = "yearly")]
    pub period: PeriodArg,

    /// Annual benefits in kind
    #[arg(long)]
    pub benefits: Option<Decimal>,

    /// Salaries per year (e.g. 14 in Austria)
    #[arg(long)]
    pub salary_months: Option<u32>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PeriodArg {
    Monthly,
    Yearly,
}

impl From<PeriodArg> for SalaryPeriod {
    fn from(period: PeriodArg) -> Self {
        match period {
            PeriodArg::Monthly => SalaryPeriod::Monthly,
            PeriodArg::Yearly => SalaryPeriod::Yearly,
        }
    }
}

/// Context selection plus salary input, as read from a file or stdin.
#[derive(Debug, Serialize, Deserialize)]
pub struct ComputeRequest {
    #[serde(flatten)]
    pub options: ContextOptions,
    #[serde(flatten)]
    pub input: SalaryInput,
}

impl ComputeArgs {
    fn request(&self, config: &EngineConfig) -> Result<ComputeRequest, Box<dyn std::error::Error>> {
        let document: Option<ComputeRequest> = if let Some(ref path) = self.input {
            Some(input::file::read_document(path)?)
        } else if let Some(data) = input::stdin::read_stdin()? {
            Some(serde_json::from_value(data)?)
        } else {
            None
        };

        if let Some(mut request) = document {
            // Engine configuration decides strictness, not the input file
            request.options.diagnostics = config.diagnostics;
            return Ok(request);
        }

        let amount = self
            .amount
            .ok_or("--amount is required (or provide --input)")?;
        Ok(ComputeRequest {
            options: self.selection.options(config)?,
            input: SalaryInput {
                salary_amount: amount,
                salary_period: self.period.into(),
                benefits_annual: self.benefits,
                salary_months: self.salary_months,
            },
        })
    }
}

pub async fn run_compute(
    args: ComputeArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let request = args.request(config)?;
    let start = Instant::now();

    let repository = RuleRepository::from_config(config);
    let result = compute_salary_with_context(&repository, &request.options, &request.input).await?;
    tracing::info!(
        calc_mode = %result.calc_mode,
        net = %result.annual.net,
        tco = %result.annual.tco,
        "compute finished"
    );

    let output = with_metadata(
        &format!("Gross-to-net ({})", result.calc_mode),
        &request,
        result.warnings.clone(),
        elapsed_us(start),
        &result,
    );
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_request_reads_options_and_input_from_one_object() {
        let request: ComputeRequest = serde_json::from_value(json!({
            "countryCode": "AT",
            "year": 2026,
            "childrenCount": 1,
            "salaryAmount": 3000,
            "salaryPeriod": "monthly",
            "salaryMonths": 14
        }))
        .unwrap();
        assert_eq!(request.options.country_code, "AT");
        assert_eq!(request.options.children_count, 1);
        assert_eq!(request.input.salary_amount, dec!(3000));
        assert_eq!(request.input.salary_period, SalaryPeriod::Monthly);
        assert_eq!(request.input.salary_months, Some(14));
    }
}
