use std::time::Instant;

use clap::Args;
use serde_json::{json, Value};

use net_pay_core::rules::repository::supported_countries;
use net_pay_core::types::with_metadata;
use net_pay_core::{lint_document, Diagnostics, EngineConfig, RuleRepository};

use super::elapsed_us;

/// Arguments for the tax class lint
#[derive(Args)]
pub struct LintArgs {
    /// Countries to check (comma-separated; defaults to all supported)
    #[arg(long, value_delimiter = ',')]
    pub country: Vec<String>,
}

pub async fn run_lint(args: LintArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let countries: Vec<String> = if args.country.is_empty() {
        supported_countries().into_iter().map(String::from).collect()
    } else {
        args.country
    };
    let start = Instant::now();

    // Load without load-time linting so every class gets reported
    let repository = RuleRepository::from_config(config).with_diagnostics(Diagnostics::Off);

    let mut diagnostics = Vec::new();
    for code in &countries {
        let document = repository.load(code).await?;
        let found = lint_document(&document)?;
        tracing::debug!(country = %document.country_code, count = found.len(), "linted rule document");
        diagnostics.extend(found);
    }

    let warnings: Vec<String> = diagnostics
        .iter()
        .map(|d| format!("{}: {}", d.country_code, d.message))
        .collect();
    let output = with_metadata(
        "Tax class income-tax effect check",
        &json!({ "countries": countries }),
        warnings,
        elapsed_us(start),
        &diagnostics,
    );
    Ok(serde_json::to_value(output)?)
}
