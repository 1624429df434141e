//! Threshold classification for probe metrics
//!
//! Maps raw metric readings (or the unavailable sentinel) to a severity
//! tier. Cut points and directionality are per-metric configuration loaded
//! from `health.toml`, never inferred from the metric itself.

use super::{Metric, MetricValue, Outcome};
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity tier of a single report cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tier {
    Pass,
    Warn,
    Fail,
    NotApplicable,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Pass => "Pass",
            Tier::Warn => "Warn",
            Tier::Fail => "Fail",
            Tier::NotApplicable => "N/A",
        }
    }

    /// CSS class used by the HTML renderer
    pub fn css_class(&self) -> &'static str {
        match self {
            Tier::Pass => "tier-pass",
            Tier::Warn => "tier-warn",
            Tier::Fail => "tier-fail",
            Tier::NotApplicable => "tier-na",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            Tier::Pass => "#16a34a",
            Tier::Warn => "#ca8a04",
            Tier::Fail => "#dc2626",
            Tier::NotApplicable => "#6b7280",
        }
    }

    /// Console rendering of an arbitrary label in this tier's color
    pub fn paint(&self, text: &str) -> ColoredString {
        match self {
            Tier::Pass => text.green(),
            Tier::Warn => text.yellow(),
            Tier::Fail => text.red(),
            Tier::NotApplicable => text.dimmed(),
        }
    }

    /// Tier shown for a diagnostic sub-test outcome
    pub fn for_outcome(outcome: Outcome) -> Tier {
        match outcome {
            Outcome::Passed => Tier::Pass,
            Outcome::Failed | Outcome::Inaccessible => Tier::Fail,
            Outcome::NoData => Tier::NotApplicable,
        }
    }

    fn severity(&self) -> u8 {
        match self {
            Tier::Pass => 0,
            Tier::NotApplicable => 1,
            Tier::Warn => 2,
            Tier::Fail => 3,
        }
    }

    /// Worst tier of a set, `Pass` when empty
    pub fn worst<I: IntoIterator<Item = Tier>>(tiers: I) -> Tier {
        tiers
            .into_iter()
            .max_by_key(|t| t.severity())
            .unwrap_or(Tier::Pass)
    }
}

/// Whether larger readings are healthier or sicker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

/// Cut points for one metric
///
/// For `HigherIsBetter` the boundaries mark the first value of the better
/// tier: `v < fail` fails, `v < warn` warns, the rest passes. For
/// `LowerIsBetter` they mark the first value of the worse tier: `v >= fail`
/// fails, `v >= warn` warns. Either bound may be absent; an absent `fail`
/// means only the unavailable sentinel can fail the metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdSpec {
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fail: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<f64>,
}

impl ThresholdSpec {
    pub fn higher_is_better(fail: Option<f64>, warn: Option<f64>) -> Self {
        Self {
            direction: Direction::HigherIsBetter,
            fail,
            warn,
        }
    }

    pub fn lower_is_better(fail: Option<f64>, warn: Option<f64>) -> Self {
        Self {
            direction: Direction::LowerIsBetter,
            fail,
            warn,
        }
    }

    /// Pure, total classification: every representable input maps to
    /// exactly one tier. The unavailable sentinel always fails.
    pub fn classify(&self, value: MetricValue) -> Tier {
        let v = match value {
            MetricValue::Measured(v) => v,
            MetricValue::Unavailable => return Tier::Fail,
        };

        match self.direction {
            Direction::HigherIsBetter => {
                if self.fail.is_some_and(|f| v < f) {
                    Tier::Fail
                } else if self.warn.is_some_and(|w| v < w) {
                    Tier::Warn
                } else {
                    Tier::Pass
                }
            }
            Direction::LowerIsBetter => {
                if self.fail.is_some_and(|f| v >= f) {
                    Tier::Fail
                } else if self.warn.is_some_and(|w| v >= w) {
                    Tier::Warn
                } else {
                    Tier::Pass
                }
            }
        }
    }
}

/// The full per-metric threshold table
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Thresholds {
    pub metrics: BTreeMap<Metric, ThresholdSpec>,
}

impl Default for Thresholds {
    fn default() -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            Metric::FreeSpaceGb,
            ThresholdSpec::higher_is_better(Some(10.0), Some(20.0)),
        );
        metrics.insert(
            Metric::ClockOffsetSeconds,
            ThresholdSpec::lower_is_better(Some(2.0), None),
        );
        // Recent reboots warn; only the sentinel fails uptime outright
        metrics.insert(
            Metric::UptimeHours,
            ThresholdSpec::higher_is_better(None, Some(24.0)),
        );
        metrics.insert(
            Metric::CertDaysRemaining,
            ThresholdSpec::higher_is_better(Some(30.0), Some(60.0)),
        );
        Self { metrics }
    }
}

impl Thresholds {
    /// Classify one metric reading; metrics without a configured spec are
    /// `NotApplicable` (unless the reading is the sentinel, which always
    /// fails).
    pub fn classify(&self, metric: Metric, value: MetricValue) -> Tier {
        match self.metrics.get(&metric) {
            Some(spec) => spec.classify(value),
            None => match value {
                MetricValue::Unavailable => Tier::Fail,
                MetricValue::Measured(_) => Tier::NotApplicable,
            },
        }
    }
}
