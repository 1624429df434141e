//! Domain controller health commands
//!
//! `health report` sweeps a list of hosts and writes an HTML (or CSV)
//! report; `health probe` checks a single host and prints the results to
//! the console. `health init-config` writes the default `health.toml` so
//! thresholds and probe commands can be tuned per deployment.

use crate::cmd::progress;
use crate::config::ConfigManager;
use crate::error::{AdctlError, Result};
use crate::health::{run_sweep, CommandProber, HostProbeResult, Metric, Thresholds, Tier};
use crate::report::{csv_export, html, ReportMetadata};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct HealthReportArgs {
    /// Host to probe (repeatable)
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// File with one host per line (# comments allowed)
    #[arg(long)]
    hosts_file: Option<PathBuf>,

    /// Domain name shown in the report header
    #[arg(long, default_value = "")]
    domain: String,

    /// Report title
    #[arg(long, default_value = "Domain Controller Health Report")]
    title: String,

    /// Output file (.html or .csv, decided by extension)
    #[arg(short, long, default_value = "health-report.html")]
    output: PathBuf,
}

#[derive(Args, Debug)]
pub struct HealthProbeArgs {
    /// Host to probe
    host: String,
}

#[derive(Args, Debug)]
pub struct HealthInitConfigArgs {
    /// Overwrite an existing health.toml
    #[arg(long)]
    force: bool,
}

/// Read the host list from flags and/or the hosts file, preserving order
fn resolve_hosts(args_hosts: &[String], hosts_file: Option<&PathBuf>) -> Result<Vec<String>> {
    let mut hosts: Vec<String> = args_hosts.to_vec();

    if let Some(path) = hosts_file {
        let contents = fs::read_to_string(path).map_err(|e| {
            AdctlError::HostList(format!("cannot read {}: {}", path.display(), e))
        })?;

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            hosts.push(line.to_string());
        }
    }

    if hosts.is_empty() {
        return Err(AdctlError::HostList(
            "no hosts given; use --host or --hosts-file".into(),
        ));
    }

    Ok(hosts)
}

pub async fn report(args: HealthReportArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let health_config = config_manager.load_health_config()?;

    let hosts = resolve_hosts(&args.hosts, args.hosts_file.as_ref())?;
    let requested = health_config.sub_tests.clone();
    let locales = health_config.locales()?;
    let prober = CommandProber::new(health_config.probe.clone());

    println!(
        "\n{} Probing {} host(s) sequentially...",
        "→".cyan(),
        hosts.len()
    );

    let bar = progress::create_progress_bar(hosts.len() as u64, "Probing hosts");
    // Completed probes drive the bar, so 100% means the sweep is done
    let results = run_sweep(&prober, &hosts, &requested, &locales, |result| {
        bar.set_message(format!("Probed {}", result.host_name));
        bar.inc(1);
    });
    progress::finish_progress_success(&bar, "Sweep complete");

    let thresholds = &health_config.thresholds;
    print_sweep_summary(&results, thresholds);

    let is_csv = args
        .output
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);

    if is_csv {
        let file = fs::File::create(&args.output)?;
        csv_export::write_health_summary(file, thresholds, &results)?;
    } else {
        let metadata = ReportMetadata::new(args.title, args.domain);
        let document = html::render_health_report(&metadata, thresholds, &results);
        fs::write(&args.output, document)?;
    }

    println!(
        "\n{} Report written to {}",
        "✓".green(),
        args.output.display().to_string().bold()
    );

    Ok(())
}

fn print_sweep_summary(results: &[HostProbeResult], thresholds: &Thresholds) {
    let mut pass = 0usize;
    let mut warn = 0usize;
    let mut fail = 0usize;

    for host in results {
        match host.overall_tier(thresholds) {
            Tier::Pass | Tier::NotApplicable => pass += 1,
            Tier::Warn => warn += 1,
            Tier::Fail => fail += 1,
        }
    }

    println!(
        "\n{} {} healthy, {} degraded, {} failing",
        "→".cyan(),
        pass.to_string().green(),
        warn.to_string().yellow(),
        fail.to_string().red()
    );
}

pub async fn probe(args: HealthProbeArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let health_config = config_manager.load_health_config()?;

    let requested = health_config.sub_tests.clone();
    let locales = health_config.locales()?;
    let prober = CommandProber::new(health_config.probe.clone());

    let spinner = progress::create_spinner(&format!("Probing {}...", args.host));
    let result = crate::health::probe_host(&prober, &args.host, &requested, &locales);

    if result.reachable {
        progress::finish_spinner_success(&spinner, &format!("{} is reachable", args.host));
    } else {
        progress::finish_spinner_error(&spinner, &format!("{} is unreachable", args.host));
    }

    let thresholds = &health_config.thresholds;

    println!("\n{}", "Metrics:".bold());
    println!("{}", "─".repeat(60));
    for metric in Metric::ALL {
        let value = result.metric(metric);
        let tier = thresholds.classify(metric, value);
        println!(
            "  {:<18} {:>14}  {}",
            metric.label(),
            value.display(),
            tier.paint(tier.as_str())
        );
    }

    println!("\n{}", "Diagnostic sub-tests:".bold());
    println!("{}", "─".repeat(60));
    for (name, outcome) in &result.sub_tests {
        let tier = Tier::for_outcome(*outcome);
        println!("  {:<18} {}", name, tier.paint(outcome.as_str()));
    }

    let overall = result.overall_tier(thresholds);
    println!("\n{} Overall: {}", "→".cyan(), overall.paint(overall.as_str()).bold());

    Ok(())
}

pub async fn init_config(args: HealthInitConfigArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;

    if config_manager.health_file().exists() && !args.force {
        return Err(AdctlError::ConfigError(format!(
            "{} already exists; use --force to overwrite",
            config_manager.health_file().display()
        )));
    }

    let path = config_manager.write_default_health_config()?;
    println!(
        "{} Default health configuration written to {}",
        "✓".green(),
        path.display().to_string().bold()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_resolve_hosts_merges_flags_and_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# comment\ndc02\n\ndc03").unwrap();

        let hosts = resolve_hosts(
            &["dc01".to_string()],
            Some(&file.path().to_path_buf()),
        )
        .unwrap();
        assert_eq!(hosts, ["dc01", "dc02", "dc03"]);
    }

    #[test]
    fn test_resolve_hosts_empty_is_an_error() {
        assert!(matches!(
            resolve_hosts(&[], None),
            Err(AdctlError::HostList(_))
        ));
    }

    #[test]
    fn test_resolve_hosts_missing_file_is_an_error() {
        let missing = PathBuf::from("/nonexistent/hosts.txt");
        assert!(matches!(
            resolve_hosts(&[], Some(&missing)),
            Err(AdctlError::HostList(_))
        ));
    }
}
