//! Domain controller health sweep
//!
//! The recurring shape of every report in this tool: probe a remote host,
//! parse the diagnostic tool's transcript, classify each reading against the
//! threshold table, and hand fully-resolved per-host records to a renderer.
//!
//! Hosts are probed strictly sequentially, in enumeration order. A failure
//! against one host is captured inside its record and never aborts the run.

pub mod classify;
pub mod dcdiag;
pub mod probe;

pub use classify::{Direction, ThresholdSpec, Thresholds, Tier};
pub use dcdiag::{parse_diag_output, DiagLocale, LocaleSpec};
pub use probe::{CommandProber, HostProber, ProbeCommands};

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The closed set of per-host metrics collected by the sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    UptimeHours,
    FreeSpaceGb,
    ClockOffsetSeconds,
    CertDaysRemaining,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::UptimeHours,
        Metric::FreeSpaceGb,
        Metric::ClockOffsetSeconds,
        Metric::CertDaysRemaining,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::UptimeHours => "uptimeHours",
            Metric::FreeSpaceGb => "freeSpaceGB",
            Metric::ClockOffsetSeconds => "clockOffsetSeconds",
            Metric::CertDaysRemaining => "certDaysRemaining",
        }
    }

    /// Column heading used by the renderers
    pub fn label(&self) -> &'static str {
        match self {
            Metric::UptimeHours => "Uptime (h)",
            Metric::FreeSpaceGb => "Free Space (GB)",
            Metric::ClockOffsetSeconds => "Clock Offset (s)",
            Metric::CertDaysRemaining => "Cert Days Left",
        }
    }
}

/// A metric reading: measured, or the could-not-measure sentinel.
/// The two are mutually exclusive per metric per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MetricValue {
    Measured(f64),
    Unavailable,
}

impl MetricValue {
    /// Display form for report cells
    pub fn display(&self) -> String {
        match self {
            MetricValue::Measured(v) => format!("{:.2}", v),
            MetricValue::Unavailable => "unavailable".to_string(),
        }
    }
}

/// Outcome of one named diagnostic sub-test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Passed,
    Failed,
    NoData,
    Inaccessible,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Passed => "Passed",
            Outcome::Failed => "Failed",
            Outcome::NoData => "No Data",
            Outcome::Inaccessible => "Inaccessible",
        }
    }
}

/// Sub-tests requested from the diagnostic tool when none are configured
pub const DEFAULT_SUB_TESTS: &[&str] = &[
    "Advertising",
    "Connectivity",
    "DFSREvent",
    "KccEvent",
    "NetLogons",
    "Replications",
    "Services",
    "SysVolCheck",
];

/// Fully-resolved probe record for one host in one run
///
/// Every declared metric and every requested sub-test is present with a
/// value-or-sentinel before the record reaches a renderer; renderers never
/// special-case a missing key. Records live for one run only.
#[derive(Debug, Clone, Serialize)]
pub struct HostProbeResult {
    pub host_name: String,
    pub reachable: bool,
    pub metrics: BTreeMap<Metric, MetricValue>,
    pub sub_tests: BTreeMap<String, Outcome>,
}

impl HostProbeResult {
    /// Uniform record for a host that failed the reachability probe:
    /// every metric is the sentinel, every sub-test Failed
    pub fn unreachable(host_name: &str, requested: &[String]) -> Self {
        Self {
            host_name: host_name.to_string(),
            reachable: false,
            metrics: Metric::ALL
                .into_iter()
                .map(|m| (m, MetricValue::Unavailable))
                .collect(),
            sub_tests: requested
                .iter()
                .map(|name| (name.clone(), Outcome::Failed))
                .collect(),
        }
    }

    pub fn metric(&self, metric: Metric) -> MetricValue {
        self.metrics
            .get(&metric)
            .copied()
            .unwrap_or(MetricValue::Unavailable)
    }

    /// Worst tier across all metric and sub-test cells of this host
    pub fn overall_tier(&self, thresholds: &Thresholds) -> Tier {
        let metric_tiers = Metric::ALL
            .into_iter()
            .map(|m| thresholds.classify(m, self.metric(m)));
        let sub_test_tiers = self.sub_tests.values().map(|o| Tier::for_outcome(*o));
        Tier::worst(metric_tiers.chain(sub_test_tiers))
    }
}

/// Everything `health report` reads from `health.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub thresholds: Thresholds,
    pub probe: ProbeCommands,
    pub sub_tests: Vec<String>,
    /// Extra diagnostic-tool locales beyond the built-in English and German
    pub extra_locales: Vec<LocaleSpec>,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            probe: ProbeCommands::default(),
            sub_tests: DEFAULT_SUB_TESTS.iter().map(|s| s.to_string()).collect(),
            extra_locales: Vec::new(),
        }
    }
}

impl HealthConfig {
    pub fn locales(&self) -> Result<Vec<DiagLocale>> {
        let mut locales = DiagLocale::builtin();
        for spec in &self.extra_locales {
            locales.push(DiagLocale::from_spec(spec)?);
        }
        Ok(locales)
    }
}

/// Probe a single host and return its fully-resolved record
pub fn probe_host(
    prober: &dyn HostProber,
    host: &str,
    requested: &[String],
    locales: &[DiagLocale],
) -> HostProbeResult {
    if !prober.check_reachable(host) {
        tracing::warn!(host, "host unreachable, short-circuiting probes");
        return HostProbeResult::unreachable(host, requested);
    }

    let metrics = Metric::ALL
        .into_iter()
        .map(|m| (m, prober.measure(host, m)))
        .collect();

    let sub_tests = match prober.run_diagnostics(host) {
        Ok(transcript) => parse_diag_output(&transcript, requested, locales),
        Err(e) => {
            tracing::warn!(host, error = %e, "diagnostic tool invocation failed");
            dcdiag::inaccessible_results(requested)
        }
    };

    HostProbeResult {
        host_name: host.to_string(),
        reachable: true,
        metrics,
        sub_tests,
    }
}

/// Probe every host, one at a time, in input order. `on_probed` fires after
/// each host's record is complete (progress reporting).
pub fn run_sweep(
    prober: &dyn HostProber,
    hosts: &[String],
    requested: &[String],
    locales: &[DiagLocale],
    mut on_probed: impl FnMut(&HostProbeResult),
) -> Vec<HostProbeResult> {
    hosts
        .iter()
        .map(|host| {
            let result = probe_host(prober, host, requested, locales);
            on_probed(&result);
            result
        })
        .collect()
}
