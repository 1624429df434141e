//! CSV rendering
//!
//! The summary writer mirrors the HTML infrastructure table (value plus tier
//! per metric); `write_records` is the generic path the directory reports
//! use for their serde row types.

use crate::error::Result;
use crate::health::{HostProbeResult, Metric, Thresholds};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// Write the health summary table: one row per host, in input order
pub fn write_health_summary<W: Write>(
    writer: W,
    thresholds: &Thresholds,
    hosts: &[HostProbeResult],
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut headers = vec!["host".to_string(), "reachable".to_string()];
    for metric in Metric::ALL {
        headers.push(metric.as_str().to_string());
        headers.push(format!("{}Tier", metric.as_str()));
    }
    headers.push("overallTier".to_string());
    wtr.write_record(&headers)?;

    for host in hosts {
        let mut row = vec![host.host_name.clone(), host.reachable.to_string()];
        for metric in Metric::ALL {
            let value = host.metric(metric);
            row.push(value.display());
            row.push(thresholds.classify(metric, value).as_str().to_string());
        }
        row.push(host.overall_tier(thresholds).as_str().to_string());
        wtr.write_record(&row)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Serialize arbitrary report rows to a CSV file
pub fn write_records<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{MetricValue, Outcome};
    use std::collections::BTreeMap;

    #[test]
    fn test_summary_csv_shape() {
        let mut metrics = BTreeMap::new();
        metrics.insert(Metric::UptimeHours, MetricValue::Measured(72.0));
        metrics.insert(Metric::FreeSpaceGb, MetricValue::Measured(15.0));
        metrics.insert(Metric::ClockOffsetSeconds, MetricValue::Measured(0.1));
        metrics.insert(Metric::CertDaysRemaining, MetricValue::Unavailable);

        let mut sub_tests = BTreeMap::new();
        sub_tests.insert("Connectivity".to_string(), Outcome::Passed);

        let hosts = vec![HostProbeResult {
            host_name: "dc01".to_string(),
            reachable: true,
            metrics,
            sub_tests,
        }];

        let mut buf = Vec::new();
        write_health_summary(&mut buf, &Thresholds::default(), &hosts).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("host,reachable,uptimeHours"));
        assert!(header.ends_with("overallTier"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("dc01,true"));
        // Free space at 15 GB sits in the warn band; missing cert fails
        assert!(row.contains("15.00,Warn"));
        assert!(row.contains("unavailable,Fail"));
        assert!(row.ends_with("Fail"));
    }

    #[test]
    fn test_rows_preserve_input_order() {
        let requested = vec!["Connectivity".to_string()];
        let hosts = vec![
            HostProbeResult::unreachable("zeta", &requested),
            HostProbeResult::unreachable("alpha", &requested),
        ];

        let mut buf = Vec::new();
        write_health_summary(&mut buf, &Thresholds::default(), &hosts).unwrap();
        let text = String::from_utf8(buf).unwrap();

        let zeta = text.find("zeta").unwrap();
        let alpha = text.find("alpha").unwrap();
        assert!(zeta < alpha);
    }
}
