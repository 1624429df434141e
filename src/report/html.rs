//! HTML rendering of the health sweep
//!
//! Fixed section layout: header, infrastructure summary table (hosts ×
//! metrics, one row per host in input order), then one detail section per
//! host listing every requested sub-test with its outcome and explanation.
//! No host and no sub-test is ever silently omitted.

use crate::health::{HostProbeResult, Metric, Thresholds, Tier};

use super::{explain_sub_test, ReportMetadata};

/// Render the complete HTML health report
pub fn render_health_report(
    metadata: &ReportMetadata,
    thresholds: &Thresholds,
    hosts: &[HostProbeResult],
) -> String {
    let css = css_styles();
    let header = render_header(metadata);
    let summary = render_summary_section(thresholds, hosts);
    let details = render_host_sections(hosts);
    let footer = render_footer(metadata);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - {domain}</title>
    <style>
{css}
    </style>
</head>
<body>
    <div class="container">
{header}
{summary}
{details}
{footer}
    </div>
</body>
</html>"#,
        title = escape(&metadata.title),
        domain = escape(&metadata.domain_name),
        css = css,
        header = header,
        summary = summary,
        details = details,
        footer = footer,
    )
}

fn css_styles() -> &'static str {
    r#"
        :root {
            --primary: #1e40af;
            --secondary: #64748b;
            --light: #f8fafc;
            --dark: #1e293b;
            --border: #e2e8f0;
        }

        * { margin: 0; padding: 0; box-sizing: border-box; }

        body {
            font-family: 'Segoe UI', system-ui, -apple-system, sans-serif;
            line-height: 1.6;
            color: var(--dark);
            background: var(--light);
        }

        .container {
            max-width: 1100px;
            margin: 0 auto;
            padding: 2rem;
            background: white;
            min-height: 100vh;
        }

        .header {
            text-align: center;
            padding: 2rem 0;
            border-bottom: 3px solid var(--primary);
            margin-bottom: 2rem;
        }

        .header h1 {
            color: var(--primary);
            font-size: 2rem;
            font-weight: 600;
            margin-bottom: 0.5rem;
        }

        .header .metadata {
            display: flex;
            justify-content: center;
            gap: 2rem;
            margin-top: 1rem;
            font-size: 0.9rem;
            color: var(--secondary);
        }

        .section { margin-bottom: 2rem; }

        .section-title {
            font-size: 1.25rem;
            font-weight: 600;
            color: var(--primary);
            margin-bottom: 1rem;
            padding-bottom: 0.5rem;
            border-bottom: 2px solid var(--border);
        }

        .summary-table, .subtest-table {
            width: 100%;
            border-collapse: collapse;
        }

        .summary-table th, .summary-table td,
        .subtest-table th, .subtest-table td {
            padding: 0.6rem 0.75rem;
            text-align: left;
            border-bottom: 1px solid var(--border);
        }

        .summary-table th, .subtest-table th {
            background: var(--light);
            font-weight: 600;
            color: var(--secondary);
            font-size: 0.85rem;
            text-transform: uppercase;
        }

        .tier-pass { background: #dcfce7; color: #166534; }
        .tier-warn { background: #fef9c3; color: #854d0e; }
        .tier-fail { background: #fee2e2; color: #991b1b; }
        .tier-na   { background: #f1f5f9; color: #64748b; }

        .badge {
            display: inline-block;
            padding: 0.15rem 0.6rem;
            border-radius: 9999px;
            font-size: 0.75rem;
            font-weight: 600;
            text-transform: uppercase;
        }

        .host-section {
            border: 1px solid var(--border);
            border-radius: 8px;
            padding: 1rem;
            margin-bottom: 1rem;
            border-left: 4px solid;
        }

        .host-section.tier-pass { border-left-color: #16a34a; background: white; color: var(--dark); }
        .host-section.tier-warn { border-left-color: #ca8a04; background: white; color: var(--dark); }
        .host-section.tier-fail { border-left-color: #dc2626; background: white; color: var(--dark); }
        .host-section.tier-na   { border-left-color: #6b7280; background: white; color: var(--dark); }

        .host-title {
            font-weight: 600;
            font-size: 1.05rem;
            margin-bottom: 0.5rem;
        }

        .explanation {
            color: var(--secondary);
            font-size: 0.85rem;
        }

        .footer {
            text-align: center;
            padding: 2rem 0;
            margin-top: 2rem;
            border-top: 1px solid var(--border);
            color: var(--secondary);
            font-size: 0.85rem;
        }

        @media print {
            body { background: white; }
            .container { padding: 0; max-width: none; }
            .host-section { break-inside: avoid; }
        }
    "#
}

fn render_header(metadata: &ReportMetadata) -> String {
    format!(
        r#"        <header class="header">
            <h1>{title}</h1>
            <div class="metadata">
                <span><strong>Domain:</strong> {domain}</span>
                <span><strong>Generated:</strong> {date}</span>
                <span><strong>By:</strong> {by}</span>
            </div>
        </header>"#,
        title = escape(&metadata.title),
        domain = escape(&metadata.domain_name),
        date = metadata.generated_at.format("%Y-%m-%d %H:%M:%S"),
        by = escape(&metadata.generated_by),
    )
}

fn render_summary_section(thresholds: &Thresholds, hosts: &[HostProbeResult]) -> String {
    let metric_headers: String = Metric::ALL
        .iter()
        .map(|m| format!("<th>{}</th>", m.label()))
        .collect();

    let rows: String = hosts
        .iter()
        .map(|host| {
            let reach_tier = if host.reachable { Tier::Pass } else { Tier::Fail };
            let reach_text = if host.reachable { "Online" } else { "Unreachable" };

            let metric_cells: String = Metric::ALL
                .iter()
                .map(|m| {
                    let value = host.metric(*m);
                    let tier = thresholds.classify(*m, value);
                    format!(
                        r#"<td class="{class}">{value}</td>"#,
                        class = tier.css_class(),
                        value = value.display(),
                    )
                })
                .collect();

            format!(
                r#"                <tr>
                    <td><strong>{host}</strong></td>
                    <td class="{reach_class}">{reach_text}</td>
{metric_cells}
                </tr>"#,
                host = escape(&host.host_name),
                reach_class = reach_tier.css_class(),
                reach_text = reach_text,
                metric_cells = metric_cells,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"        <section class="section">
            <h2 class="section-title">Infrastructure Summary</h2>
            <table class="summary-table">
                <thead>
                    <tr>
                        <th>Host</th>
                        <th>Reachability</th>
{metric_headers}
                    </tr>
                </thead>
                <tbody>
{rows}
                </tbody>
            </table>
        </section>"#,
        metric_headers = metric_headers,
        rows = rows,
    )
}

fn render_host_sections(hosts: &[HostProbeResult]) -> String {
    let sections: String = hosts
        .iter()
        .map(|host| {
            // BTreeMap iteration keeps sub-tests alphabetical and stable
            let rows: String = host
                .sub_tests
                .iter()
                .map(|(name, outcome)| {
                    let tier = Tier::for_outcome(*outcome);
                    format!(
                        r#"                    <tr>
                        <td>{name}</td>
                        <td><span class="badge {class}">{outcome}</span></td>
                        <td class="explanation">{explanation}</td>
                    </tr>"#,
                        name = escape(name),
                        class = tier.css_class(),
                        outcome = outcome.as_str(),
                        explanation = explain_sub_test(name),
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");

            let worst = Tier::worst(host.sub_tests.values().map(|o| Tier::for_outcome(*o)));
            let status_note = if host.reachable {
                String::new()
            } else {
                r#" <span class="badge tier-fail">Unreachable</span>"#.to_string()
            };

            format!(
                r#"            <div class="host-section {class}">
                <div class="host-title">{host}{status_note}</div>
                <table class="subtest-table">
                    <thead>
                        <tr><th>Sub-test</th><th>Outcome</th><th>Explanation</th></tr>
                    </thead>
                    <tbody>
{rows}
                    </tbody>
                </table>
            </div>"#,
                class = worst.css_class(),
                host = escape(&host.host_name),
                status_note = status_note,
                rows = rows,
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"        <section class="section">
            <h2 class="section-title">Domain Controller Details ({count})</h2>
{sections}
        </section>"#,
        count = hosts.len(),
        sections = sections,
    )
}

fn render_footer(metadata: &ReportMetadata) -> String {
    format!(
        r#"        <footer class="footer">
            <p>Report generated by <strong>adctl</strong></p>
            <p>Domain: {domain}</p>
            <p>Run: {run_id}</p>
            <p>Generated: {date}</p>
        </footer>"#,
        domain = escape(&metadata.domain_name),
        run_id = escape(&metadata.run_id),
        date = metadata.generated_at.format("%Y-%m-%d %H:%M:%S %Z"),
    )
}

/// Minimal HTML escaping for text interpolated into the template
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{MetricValue, Outcome};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn fixed_metadata() -> ReportMetadata {
        ReportMetadata {
            title: "AD Health Report".into(),
            domain_name: "corp.example.com".into(),
            generated_at: chrono::Local.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
            generated_by: "adctl test".into(),
            run_id: "00000000-0000-0000-0000-000000000000".into(),
        }
    }

    fn healthy_host(name: &str) -> HostProbeResult {
        let mut metrics = BTreeMap::new();
        metrics.insert(Metric::UptimeHours, MetricValue::Measured(120.0));
        metrics.insert(Metric::FreeSpaceGb, MetricValue::Measured(55.0));
        metrics.insert(Metric::ClockOffsetSeconds, MetricValue::Measured(0.2));
        metrics.insert(Metric::CertDaysRemaining, MetricValue::Measured(200.0));

        let mut sub_tests = BTreeMap::new();
        sub_tests.insert("Connectivity".to_string(), Outcome::Passed);
        sub_tests.insert("Replications".to_string(), Outcome::Passed);

        HostProbeResult {
            host_name: name.to_string(),
            reachable: true,
            metrics,
            sub_tests,
        }
    }

    #[test]
    fn test_render_is_idempotent() {
        let metadata = fixed_metadata();
        let thresholds = Thresholds::default();
        let hosts = vec![healthy_host("dc01"), healthy_host("dc02")];

        let first = render_health_report(&metadata, &thresholds, &hosts);
        let second = render_health_report(&metadata, &thresholds, &hosts);
        assert_eq!(first, second);
    }

    #[test]
    fn test_every_host_and_sub_test_appears() {
        let metadata = fixed_metadata();
        let thresholds = Thresholds::default();
        let requested = vec!["Connectivity".to_string(), "Services".to_string()];
        let hosts = vec![
            healthy_host("dc01"),
            HostProbeResult::unreachable("dc02", &requested),
        ];

        let html = render_health_report(&metadata, &thresholds, &hosts);
        assert!(html.contains("dc01"));
        assert!(html.contains("dc02"));
        assert!(html.contains("Connectivity"));
        assert!(html.contains("Services"));
        assert!(html.contains("Unreachable"));
    }

    #[test]
    fn test_inaccessible_sub_tests_render_fail_tier() {
        let metadata = fixed_metadata();
        let thresholds = Thresholds::default();
        let mut host = healthy_host("dc01");
        host.sub_tests
            .insert("Replications".to_string(), Outcome::Inaccessible);

        let html = render_health_report(&metadata, &thresholds, &[host]);
        assert!(html.contains(r#"<span class="badge tier-fail">Inaccessible</span>"#));
    }

    #[test]
    fn test_metric_cells_carry_tier_classes() {
        let metadata = fixed_metadata();
        let thresholds = Thresholds::default();
        let mut host = healthy_host("dc01");
        host.metrics
            .insert(Metric::FreeSpaceGb, MetricValue::Measured(9.5));

        let html = render_health_report(&metadata, &thresholds, &[host]);
        assert!(html.contains(r#"<td class="tier-fail">9.50</td>"#));
    }

    #[test]
    fn test_host_names_are_escaped() {
        let metadata = fixed_metadata();
        let thresholds = Thresholds::default();
        let mut host = healthy_host("dc01");
        host.host_name = "dc<script>".to_string();

        let html = render_health_report(&metadata, &thresholds, &[host]);
        assert!(!html.contains("dc<script>"));
        assert!(html.contains("dc&lt;script&gt;"));
    }
}
