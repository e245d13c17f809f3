//! Today view command handler.

use super::render::record_line;
use clap::Args;
use lockout::config::LockoutConfig;
use lockout::{Brand, LockService, TodayFilter};

/// Filters for the today view.
#[derive(Args, Debug, Clone, Default)]
pub struct TodayArgs {
    /// Company substring.
    #[arg(long)]
    pub company: Option<String>,

    /// Email or contact-name substring.
    #[arg(long)]
    pub email: Option<String>,

    /// Phone digits.
    #[arg(long)]
    pub phone: Option<String>,

    /// Brand to include; repeat for several.
    #[arg(long = "brand")]
    pub brands: Vec<String>,

    /// Output format: text or json.
    #[arg(long, default_value = "text")]
    pub format: String,
}

impl TodayArgs {
    fn to_filter(&self) -> Result<TodayFilter, Box<dyn std::error::Error>> {
        let mut filter = TodayFilter::new();
        if let Some(company) = &self.company {
            filter = filter.with_company(company);
        }
        if let Some(email) = &self.email {
            filter = filter.with_email(email);
        }
        if let Some(phone) = &self.phone {
            filter = filter.with_phone(phone);
        }
        for brand in &self.brands {
            let parsed = Brand::parse(brand).ok_or_else(|| format!("unknown brand '{brand}'"))?;
            filter = filter.with_brand(parsed);
        }
        Ok(filter)
    }
}

/// Today command.
pub fn cmd_today(config: &LockoutConfig, args: &TodayArgs) -> Result<(), Box<dyn std::error::Error>> {
    let filter = args.to_filter()?;
    let service = LockService::new(lockout::storage::open_workbook(config)?, config);
    let entries = service.list_today(&filter)?;

    if args.format.eq_ignore_ascii_case("json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("Locks for {} ({}):", service.today(), entries.len());
    for entry in &entries {
        let marker = if entry.dup_today { "DUP" } else { "   " };
        println!("  {marker} {}", record_line(&entry.stored));
    }
    Ok(())
}
