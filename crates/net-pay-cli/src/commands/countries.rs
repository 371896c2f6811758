use std::time::Instant;

use clap::Args;
use serde::Serialize;
use serde_json::{json, Value};

use net_pay_core::rules::repository::{rule_file_for, supported_countries};
use net_pay_core::types::with_metadata;
use net_pay_core::{EngineConfig, RuleRepository};

use super::elapsed_us;

/// Arguments for listing supported countries
#[derive(Args)]
pub struct CountriesArgs {
    /// Load each rule document and include name, currency and years
    #[arg(long)]
    pub details: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CountryRow {
    country_code: String,
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    years: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    default_region: Option<String>,
}

pub async fn run_countries(
    args: CountriesArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let repository = RuleRepository::from_config(config);

    let mut rows = Vec::new();
    for code in supported_countries() {
        let mut row = CountryRow {
            country_code: code.to_string(),
            file: rule_file_for(code).unwrap_or_default().to_string(),
            name: None,
            currency: None,
            years: None,
            default_region: None,
        };
        if args.details {
            let document = repository.load(code).await?;
            let years: Vec<String> = document
                .available_years()
                .iter()
                .map(i32::to_string)
                .collect();
            row.name = Some(document.name.clone());
            row.currency = Some(document.currency.clone());
            row.years = Some(years.join(", "));
            row.default_region = document.default_region.clone();
        }
        rows.push(row);
    }

    let output = with_metadata(
        "Supported countries",
        &json!({ "details": args.details }),
        vec![],
        elapsed_us(start),
        rows,
    );
    Ok(serde_json::to_value(output)?)
}
