pub mod compute;
pub mod context;
pub mod countries;
pub mod lint;

use chrono::Datelike;
use clap::Args;

use net_pay_core::{ContextOptions, EngineConfig};

/// Country, year and modifiers shared by commands that resolve a context.
#[derive(Args)]
pub struct ContextSelection {
    /// Country code (e.g. DE, AT, ES, UK)
    #[arg(long)]
    pub country: Option<String>,

    /// Tax year (defaults to the current year)
    #[arg(long)]
    pub year: Option<i32>,

    /// Region for dual-schedule countries
    #[arg(long)]
    pub region: Option<String>,

    /// Tax class, where the country defines them
    #[arg(long)]
    pub tax_class: Option<String>,

    /// Number of dependent children
    #[arg(long, default_value_t = 0)]
    pub children: u32,
}

impl ContextSelection {
    pub fn options(&self, config: &EngineConfig) -> Result<ContextOptions, Box<dyn std::error::Error>> {
        let country = self
            .country
            .as_deref()
            .ok_or("--country is required (or provide --input)")?;
        let mut options = ContextOptions::new(country, self.year.unwrap_or_else(current_year))
            .children(self.children)
            .diagnostics(config.diagnostics);
        if let Some(region) = &self.region {
            options = options.region(region.as_str());
        }
        if let Some(class) = &self.tax_class {
            options = options.tax_class(class.as_str());
        }
        Ok(options)
    }
}

pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Microseconds since `start`, saturating.
pub fn elapsed_us(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}
