//! Last-logon staleness report
//!
//! Pulls every member user's sign-in activity from the directory and flags
//! accounts whose most recent sign-in (interactive or not) is older than the
//! staleness window.

use crate::cmd::progress;
use crate::config::ConfigManager;
use crate::error::{AdctlError, Result};
use crate::graph::directory::{list_users_with_sign_in, DirectoryUser};
use crate::graph::GraphClient;
use crate::report::csv_export;
use chrono::Utc;
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct LastLogonArgs {
    /// Tenant name (defaults to the active tenant)
    #[arg(short, long)]
    tenant: Option<String>,

    /// Staleness window in days
    #[arg(long, default_value_t = 90)]
    days: i64,

    /// Only show stale accounts
    #[arg(long)]
    stale_only: bool,

    /// Write the full result set to a CSV file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// One row of the last-logon report
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastLogonRow {
    pub display_name: String,
    pub user_principal_name: String,
    pub account_enabled: bool,
    pub last_logon: Option<String>,
    pub days_since_logon: Option<i64>,
    pub stale: bool,
}

fn to_row(user: &DirectoryUser, stale_after_days: i64) -> LastLogonRow {
    let last_logon = user.last_logon();
    let days_since = last_logon.map(|t| (Utc::now() - t).num_days());

    // Accounts that never signed in are stale by definition
    let stale = days_since.map(|d| d >= stale_after_days).unwrap_or(true);

    LastLogonRow {
        display_name: user.display_name.clone().unwrap_or_default(),
        user_principal_name: user.user_principal_name.clone(),
        account_enabled: user.account_enabled.unwrap_or(false),
        last_logon: last_logon.map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
        days_since_logon: days_since,
        stale,
    }
}

pub async fn report(args: LastLogonArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;

    let tenant_name = match args.tenant {
        Some(name) => name,
        None => config_manager
            .load_config()?
            .current_tenant
            .ok_or_else(|| AdctlError::ConfigError("No active tenant; run 'adctl login'".into()))?,
    };

    let client = GraphClient::from_config(&config_manager, &tenant_name).await?;

    let spinner = progress::create_spinner("Fetching users with sign-in activity...");
    let users = match list_users_with_sign_in(&client).await {
        Ok(users) => {
            progress::finish_spinner_success(&spinner, &format!("{} users fetched", users.len()));
            users
        }
        Err(e) => {
            progress::finish_spinner_error(&spinner, "Failed to fetch users");
            return Err(e);
        }
    };

    let mut rows: Vec<LastLogonRow> = users.iter().map(|u| to_row(u, args.days)).collect();
    rows.sort_by(|a, b| {
        b.days_since_logon
            .unwrap_or(i64::MAX)
            .cmp(&a.days_since_logon.unwrap_or(i64::MAX))
    });

    let stale_count = rows.iter().filter(|r| r.stale).count();

    println!(
        "\n{} (stale after {} days)",
        "Last Logon Report".bold(),
        args.days
    );
    println!("{}", "─".repeat(90));
    println!(
        "{:<35} {:<30} {:>12} {:>8}",
        "User", "Last Logon", "Days Ago", "Status"
    );
    println!("{}", "─".repeat(90));

    for row in &rows {
        if args.stale_only && !row.stale {
            continue;
        }

        let status = if row.stale {
            "STALE".red()
        } else {
            "active".green()
        };
        let days = row
            .days_since_logon
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<35} {:<30} {:>12} {:>8}",
            row.user_principal_name,
            row.last_logon.as_deref().unwrap_or("never"),
            days,
            status
        );
    }

    println!("{}", "─".repeat(90));
    println!(
        "{} {} of {} accounts stale",
        "→".cyan(),
        stale_count.to_string().red(),
        rows.len()
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
    use crate::graph::directory::SignInActivity;
    use chrono::Duration;

    fn user_with_logon(days_ago: i64) -> DirectoryUser {
        DirectoryUser {
            id: "1".into(),
            display_name: Some("Test".into()),
            user_principal_name: "test@contoso.com".into(),
            account_enabled: Some(true),
            sign_in_activity: Some(SignInActivity {
                last_sign_in_date_time: Some(Utc::now() - Duration::days(days_ago)),
                last_non_interactive_sign_in_date_time: None,
            }),
        }
    }

    #[test]
    fn test_recent_logon_is_not_stale() {
        let row = to_row(&user_with_logon(5), 90);
        assert!(!row.stale);
        assert_eq!(row.days_since_logon, Some(5));
    }

    #[test]
    fn test_old_logon_is_stale() {
        let row = to_row(&user_with_logon(120), 90);
        assert!(row.stale);
    }

    #[test]
    fn test_never_signed_in_is_stale() {
        let user = DirectoryUser {
            id: "1".into(),
            display_name: None,
            user_principal_name: "new@contoso.com".into(),
            account_enabled: Some(true),
            sign_in_activity: None,
        };
        let row = to_row(&user, 90);
        assert!(row.stale);
        assert!(row.last_logon.is_none());
    }
}
