//! Report assembly
//!
//! Renderers take fully-resolved probe records plus a metadata block and
//! produce a document. Rendering is deterministic: the same records and the
//! same metadata (including `generated_at` and `run_id`) produce identical
//! bytes, which keeps reports diffable between runs.

pub mod csv_export;
pub mod html;

use chrono::{DateTime, Local};

/// Report header fields shared by all renderers
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    pub title: String,
    pub domain_name: String,
    pub generated_at: DateTime<Local>,
    pub generated_by: String,
    pub run_id: String,
}

impl ReportMetadata {
    pub fn new(title: impl Into<String>, domain_name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            domain_name: domain_name.into(),
            generated_at: Local::now(),
            generated_by: format!("adctl {}", env!("CARGO_PKG_VERSION")),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Human-readable explanation for a diagnostic sub-test, looked up by name.
/// Unrecognized names fall back to a generic explanation.
pub fn explain_sub_test(name: &str) -> &'static str {
    match name {
        "Advertising" => "The domain controller advertises itself in DNS and as a DC, GC, and time server as appropriate.",
        "Connectivity" => "DNS resolution and RPC/LDAP binds to the domain controller succeed.",
        "DFSREvent" => "No warning or error events from the DFS Replication service in the last 24 hours.",
        "FrsEvent" => "No warning or error events from the File Replication Service in the last 24 hours.",
        "KccEvent" => "The Knowledge Consistency Checker completed without errors; the replication topology is intact.",
        "KnowsOfRoleHolders" => "The domain controller can locate all five FSMO role holders.",
        "MachineAccount" => "The machine account exists, is correctly registered, and has valid service principal names.",
        "NCSecDesc" => "Security descriptors on naming context heads grant the permissions replication requires.",
        "NetLogons" => "Core logon privileges allow replication and authentication traffic.",
        "ObjectsReplicated" => "Key directory objects have replicated to this domain controller.",
        "Replications" => "Recent inbound replication attempts for all naming contexts succeeded.",
        "RidManager" => "The RID master is reachable and this DC holds a healthy RID pool.",
        "Services" => "All services required for directory operation are running (e.g. Netlogon, KDC, DFSR, W32Time).",
        "SystemLog" => "No error entries in the System event log in the last 60 minutes.",
        "SysVolCheck" => "The SYSVOL share is ready and advertised; Group Policy can replicate.",
        "VerifyReferences" => "System references for replication infrastructure objects are intact.",
        _ => "Diagnostic sub-test reported by the external tool; consult the tool's documentation for details.",
    }
}
