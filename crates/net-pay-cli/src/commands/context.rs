use std::time::Instant;

use clap::Args;
use serde_json::Value;

use net_pay_core::types::with_metadata;
use net_pay_core::{build_tax_context_from_repository, EngineConfig, RuleRepository};

use super::{elapsed_us, ContextSelection};

/// Arguments for tax context resolution
#[derive(Args)]
pub struct ContextArgs {
    #[command(flatten)]
    pub selection: ContextSelection,
}

pub async fn run_context(
    args: ContextArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let options = args.selection.options(config)?;
    let start = Instant::now();

    let repository = RuleRepository::from_config(config);
    let ctx = build_tax_context_from_repository(&repository, &options).await?;

    let output = with_metadata(
        &format!("Tax context resolution ({})", ctx.calc_mode()),
        &options,
        ctx.warnings().to_vec(),
        elapsed_us(start),
        &ctx,
    );
    Ok(serde_json::to_value(output)?)
}
