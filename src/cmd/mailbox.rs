//! Mailbox usage report
//!
//! Fetches the Graph mailbox usage detail report and classifies each
//! mailbox's quota consumption with the same tiering used by the health
//! sweep (higher usage is worse).

use crate::cmd::progress;
use crate::config::ConfigManager;
use crate::error::{AdctlError, Result};
use crate::graph::directory::{mailbox_usage, MailboxUsage};
use crate::graph::GraphClient;
use crate::health::{MetricValue, ThresholdSpec, Tier};
use crate::report::csv_export;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct MailboxUsageArgs {
    /// Tenant name (defaults to the active tenant)
    #[arg(short, long)]
    tenant: Option<String>,

    /// Report period (D7, D30, D90 or D180)
    #[arg(long, default_value = "D7")]
    period: String,

    /// Usage percentage that counts as degraded
    #[arg(long, default_value_t = 75.0)]
    warn: f64,

    /// Usage percentage that counts as failing
    #[arg(long, default_value_t = 90.0)]
    fail: f64,

    /// Write the full result set to a CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxRow {
    pub display_name: String,
    pub user_principal_name: String,
    pub storage_used_gb: Option<f64>,
    pub quota_gb: Option<f64>,
    pub used_percent: Option<f64>,
    pub tier: String,
}

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

fn to_row(usage: &MailboxUsage, spec: &ThresholdSpec) -> MailboxRow {
    let used_percent = usage.used_percent();
    let value = match used_percent {
        Some(p) => MetricValue::Measured(p),
        None => MetricValue::Unavailable,
    };

    MailboxRow {
        display_name: usage.display_name.clone(),
        user_principal_name: usage.user_principal_name.clone(),
        storage_used_gb: usage.storage_used_bytes.map(|b| b as f64 / BYTES_PER_GB),
        quota_gb: usage.quota_bytes.map(|b| b as f64 / BYTES_PER_GB),
        used_percent,
        tier: spec.classify(value).as_str().to_string(),
    }
}

pub async fn usage(args: MailboxUsageArgs) -> Result<()> {
    if args.warn >= args.fail {
        return Err(AdctlError::InvalidConfig(format!(
            "--warn ({}) must be below --fail ({})",
            args.warn, args.fail
        )));
    }

    let config_manager = ConfigManager::new()?;

    let tenant_name = match args.tenant {
        Some(name) => name,
        None => config_manager
            .load_config()?
            .current_tenant
            .ok_or_else(|| AdctlError::ConfigError("No active tenant; run 'adctl login'".into()))?,
    };

    let client = GraphClient::from_config(&config_manager, &tenant_name).await?;

    let spec = ThresholdSpec::lower_is_better(Some(args.fail), Some(args.warn));

    let spinner = progress::create_spinner(&format!(
        "Fetching mailbox usage report (period {})...",
        args.period
    ));
    let mailboxes = match mailbox_usage(&client, &args.period).await {
        Ok(rows) => {
            progress::finish_spinner_success(&spinner, &format!("{} mailboxes", rows.len()));
            rows
        }
        Err(e) => {
            progress::finish_spinner_error(&spinner, "Failed to fetch report");
            return Err(e);
        }
    };

    let mut rows: Vec<MailboxRow> = mailboxes.iter().map(|m| to_row(m, &spec)).collect();
    rows.sort_by(|a, b| {
        b.used_percent
            .unwrap_or(-1.0)
            .partial_cmp(&a.used_percent.unwrap_or(-1.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!("\n{}", "Mailbox Usage Report".bold());
    println!("{}", "─".repeat(90));
    println!(
        "{:<40} {:>12} {:>12} {:>8} {:>8}",
        "User", "Used (GB)", "Quota (GB)", "Used %", "Tier"
    );
    println!("{}", "─".repeat(90));

    for row in &rows {
        let tier = match row.tier.as_str() {
            "Fail" => Tier::Fail,
            "Warn" => Tier::Warn,
            _ => Tier::Pass,
        };

        println!(
            "{:<40} {:>12} {:>12} {:>8} {:>8}",
            row.user_principal_name,
            row.storage_used_gb
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string()),
            row.quota_gb
                .map(|v| format!("{:.2}", v))
                .unwrap_or_else(|| "-".to_string()),
            row.used_percent
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "-".to_string()),
            tier.paint(&row.tier)
        );
    }

    let over_warn = rows.iter().filter(|r| r.tier != "Pass").count();
    println!("{}", "─".repeat(90));
    println!(
        "{} {} of {} mailboxes above the {}% warning threshold",
        "→".cyan(),
        over_warn,
        rows.len(),
        args.warn
    );

    if let Some(path) = args.output {
        csv_export::write_records(&path, &rows)?;
        println!(
            "{} CSV written to {}",
            "✓".green(),
            path.display().to_string().bold()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailbox(used: u64, quota: u64) -> MailboxUsage {
        MailboxUsage {
            display_name: "Test".into(),
            user_principal_name: "test@contoso.com".into(),
            item_count: Some(100),
            storage_used_bytes: Some(used),
            quota_bytes: Some(quota),
            last_activity_date: None,
        }
    }

    fn spec() -> ThresholdSpec {
        ThresholdSpec::lower_is_better(Some(90.0), Some(75.0))
    }

    #[test]
    fn test_usage_tiers() {
        let quota = 100 * 1024 * 1024 * 1024u64;
        assert_eq!(to_row(&mailbox(quota / 2, quota), &spec()).tier, "Pass");
        assert_eq!(to_row(&mailbox(quota * 80 / 100, quota), &spec()).tier, "Warn");
        assert_eq!(to_row(&mailbox(quota * 95 / 100, quota), &spec()).tier, "Fail");
    }

    #[test]
    fn test_missing_quota_fails() {
        let usage = MailboxUsage {
            display_name: "X".into(),
            user_principal_name: "x@contoso.com".into(),
            item_count: None,
            storage_used_bytes: Some(1),
            quota_bytes: None,
            last_activity_date: None,
        };
        let row = to_row(&usage, &spec());
        assert!(row.used_percent.is_none());
        assert_eq!(row.tier, "Fail");
    }

    #[test]
    fn test_gb_conversion() {
        let quota = 100 * 1024 * 1024 * 1024u64;
        let row = to_row(&mailbox(quota / 2, quota), &spec());
        assert!((row.quota_gb.unwrap() - 100.0).abs() < 0.01);
        assert!((row.storage_used_gb.unwrap() - 50.0).abs() < 0.01);
    }
}
