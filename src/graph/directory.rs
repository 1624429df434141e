//! Directory and reporting queries
//!
//! User enumeration with sign-in activity (the `signInActivity` property is
//! beta-surface only) and the mailbox usage detail report, which Graph
//! serves as a CSV download.

use crate::error::{AdctlError, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::GraphClient;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub user_principal_name: String,
    #[serde(default)]
    pub account_enabled: Option<bool>,
    #[serde(default)]
    pub sign_in_activity: Option<SignInActivity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInActivity {
    #[serde(default)]
    pub last_sign_in_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_non_interactive_sign_in_date_time: Option<DateTime<Utc>>,
}

impl DirectoryUser {
    /// Most recent sign-in of either kind, if the user ever signed in
    pub fn last_logon(&self) -> Option<DateTime<Utc>> {
        let activity = self.sign_in_activity.as_ref()?;
        match (
            activity.last_sign_in_date_time,
            activity.last_non_interactive_sign_in_date_time,
        ) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }
}

/// Enumerate all member users with their sign-in activity
pub async fn list_users_with_sign_in(client: &GraphClient) -> Result<Vec<DirectoryUser>> {
    let filter = urlencoding::encode("userType eq 'Member'");
    let endpoint = format!(
        "users?$filter={}&$select=id,displayName,userPrincipalName,accountEnabled,signInActivity",
        filter
    );
    client.get_all_pages_beta(&endpoint).await
}

/// One parsed row of the mailbox usage detail report
#[derive(Debug, Clone, Deserialize)]
pub struct MailboxUsage {
    #[serde(rename = "Display Name")]
    pub display_name: String,
    #[serde(rename = "User Principal Name")]
    pub user_principal_name: String,
    #[serde(rename = "Item Count")]
    pub item_count: Option<u64>,
    #[serde(rename = "Storage Used (Byte)")]
    pub storage_used_bytes: Option<u64>,
    #[serde(rename = "Prohibit Send/Receive Quota (Byte)")]
    pub quota_bytes: Option<u64>,
    #[serde(rename = "Last Activity Date")]
    pub last_activity_date: Option<String>,
}

impl MailboxUsage {
    /// Storage used as a percentage of the send/receive quota
    pub fn used_percent(&self) -> Option<f64> {
        let used = self.storage_used_bytes? as f64;
        let quota = self.quota_bytes? as f64;
        if quota <= 0.0 {
            return None;
        }
        Some(used / quota * 100.0)
    }
}

/// Fetch and parse the mailbox usage detail report for the given period
/// (e.g. "D7", "D30")
pub async fn mailbox_usage(client: &GraphClient, period: &str) -> Result<Vec<MailboxUsage>> {
    if !period
        .strip_prefix('D')
        .is_some_and(|d| !d.is_empty() && d.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(AdctlError::InvalidConfig(format!(
            "Invalid report period '{}': expected D7, D30, D90 or D180",
            period
        )));
    }

    let endpoint = format!("reports/getMailboxUsageDetail(period='{}')", period);
    let csv_text = client.get_text(&endpoint).await?;
    parse_mailbox_usage_csv(&csv_text)
}

/// Parse the CSV payload of the mailbox usage report. Graph prefixes the
/// body with a UTF-8 BOM.
pub fn parse_mailbox_usage_csv(csv_text: &str) -> Result<Vec<MailboxUsage>> {
    let body = csv_text.trim_start_matches('\u{feff}');
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in rdr.deserialize() {
        let row: MailboxUsage = record?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_logon_prefers_most_recent() {
        let user = DirectoryUser {
            id: "1".into(),
            display_name: Some("Test".into()),
            user_principal_name: "test@contoso.com".into(),
            account_enabled: Some(true),
            sign_in_activity: Some(SignInActivity {
                last_sign_in_date_time: Some("2024-01-01T00:00:00Z".parse().unwrap()),
                last_non_interactive_sign_in_date_time: Some(
                    "2024-03-01T00:00:00Z".parse().unwrap(),
                ),
            }),
        };
        assert_eq!(
            user.last_logon().unwrap(),
            "2024-03-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
    }

    #[test]
    fn test_last_logon_none_when_never_signed_in() {
        let user = DirectoryUser {
            id: "1".into(),
            display_name: None,
            user_principal_name: "new@contoso.com".into(),
            account_enabled: Some(true),
            sign_in_activity: None,
        };
        assert!(user.last_logon().is_none());
    }

    #[test]
    fn test_parse_mailbox_usage_csv() {
        let csv_text = "\u{feff}Display Name,User Principal Name,Item Count,Storage Used (Byte),Prohibit Send/Receive Quota (Byte),Last Activity Date\n\
            Alice,alice@contoso.com,1200,53687091200,107374182400,2024-05-01\n\
            Bob,bob@contoso.com,10,1073741824,107374182400,\n";

        let rows = parse_mailbox_usage_csv(csv_text).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].display_name, "Alice");
        assert!((rows[0].used_percent().unwrap() - 50.0).abs() < 0.01);
        assert!(rows[1].used_percent().unwrap() < 1.1);
    }

    #[test]
    fn test_used_percent_without_quota() {
        let row = MailboxUsage {
            display_name: "X".into(),
            user_principal_name: "x@contoso.com".into(),
            item_count: None,
            storage_used_bytes: Some(100),
            quota_bytes: None,
            last_activity_date: None,
        };
        assert!(row.used_percent().is_none());
    }

    #[test]
    fn test_invalid_period_rejected() {
        // validation happens before any network call
        let err = futures_block(async {
            let client = GraphClient::with_base_url("t".into(), "http://localhost:1");
            mailbox_usage(&client, "7D").await
        });
        assert!(matches!(err, Err(AdctlError::InvalidConfig(_))));
    }

    fn futures_block<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(fut)
    }
}
