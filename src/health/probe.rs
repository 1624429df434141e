//! Per-host probes
//!
//! Each probe is a single independent check against one remote host. The
//! production implementation shells out to platform tools through command
//! templates configured in `health.toml`; the reachability check is a plain
//! TCP connect with a hard timeout so an offline host cannot stall the sweep.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::process::Command;
use std::time::Duration;

use super::{Metric, MetricValue};

/// Command templates used by [`CommandProber`]; `{host}` is substituted
/// before execution. A metric command must print a single number on stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeCommands {
    pub diagnostics: String,
    pub metrics: BTreeMap<Metric, String>,
    /// Port used for the TCP reachability check (135 = RPC endpoint mapper)
    pub reachability_port: u16,
    pub connect_timeout_secs: u64,
}

impl Default for ProbeCommands {
    fn default() -> Self {
        let mut metrics = BTreeMap::new();
        metrics.insert(
            Metric::UptimeHours,
            "powershell -NoProfile -Command \"((Get-Date) - (Get-CimInstance Win32_OperatingSystem -ComputerName {host}).LastBootUpTime).TotalHours\"".to_string(),
        );
        metrics.insert(
            Metric::FreeSpaceGb,
            "powershell -NoProfile -Command \"[math]::Round((Get-CimInstance Win32_LogicalDisk -ComputerName {host} -Filter \\\"DeviceID='C:'\\\").FreeSpace / 1GB, 2)\"".to_string(),
        );
        metrics.insert(
            Metric::ClockOffsetSeconds,
            "powershell -NoProfile -Command \"[math]::Abs([double](((w32tm /stripchart /computer:{host} /samples:1 /dataonly | Select-Object -Last 1) -split ',')[-1].Trim().TrimEnd('s')))\"".to_string(),
        );
        metrics.insert(
            Metric::CertDaysRemaining,
            "powershell -NoProfile -Command \"Invoke-Command -ComputerName {host} -ScriptBlock { (Get-ChildItem Cert:\\LocalMachine\\My | Sort-Object NotAfter | Select-Object -First 1).NotAfter.Subtract((Get-Date)).TotalDays }\"".to_string(),
        );

        Self {
            diagnostics: "dcdiag /s:{host}".to_string(),
            metrics,
            reachability_port: 135,
            connect_timeout_secs: 5,
        }
    }
}

/// Substitute the `{host}` placeholder in a command template
pub fn render_template(template: &str, host: &str) -> String {
    template.replace("{host}", host)
}

/// One independent check per call; implementations must not carry state
/// across hosts.
pub trait HostProber {
    /// Bounded connectivity check; gates all other probes for the host
    fn check_reachable(&self, host: &str) -> bool;

    /// Measure one metric, returning the sentinel on any failure
    fn measure(&self, host: &str, metric: Metric) -> MetricValue;

    /// Invoke the diagnostic tool once and capture its full text output
    fn run_diagnostics(&self, host: &str) -> Result<String>;
}

/// Production prober: TCP reachability plus external-command probes
pub struct CommandProber {
    commands: ProbeCommands,
}

impl CommandProber {
    pub fn new(commands: ProbeCommands) -> Self {
        Self { commands }
    }

    fn run_command(&self, command_line: &str) -> io::Result<std::process::Output> {
        #[cfg(target_os = "windows")]
        let output = Command::new("cmd").arg("/C").arg(command_line).output()?;
        #[cfg(not(target_os = "windows"))]
        let output = Command::new("sh").arg("-c").arg(command_line).output()?;
        Ok(output)
    }
}

impl HostProber for CommandProber {
    fn check_reachable(&self, host: &str) -> bool {
        let target = format!("{}:{}", host, self.commands.reachability_port);
        let timeout = Duration::from_secs(self.commands.connect_timeout_secs);

        let addrs = match target.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(_) => return false,
        };

        for addr in addrs {
            if TcpStream::connect_timeout(&addr, timeout).is_ok() {
                return true;
            }
        }
        false
    }

    fn measure(&self, host: &str, metric: Metric) -> MetricValue {
        let Some(template) = self.commands.metrics.get(&metric) else {
            return MetricValue::Unavailable;
        };

        let command_line = render_template(template, host);
        tracing::debug!(host, metric = metric.as_str(), %command_line, "probing");

        match self.run_command(&command_line) {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                match stdout.trim().replace(',', ".").parse::<f64>() {
                    Ok(v) => MetricValue::Measured(v),
                    Err(_) => {
                        tracing::warn!(host, metric = metric.as_str(), "unparseable probe output");
                        MetricValue::Unavailable
                    }
                }
            }
            Ok(_) | Err(_) => MetricValue::Unavailable,
        }
    }

    fn run_diagnostics(&self, host: &str) -> Result<String> {
        let command_line = render_template(&self.commands.diagnostics, host);
        tracing::debug!(host, %command_line, "invoking diagnostic tool");

        let output = self.run_command(&command_line)?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        // dcdiag exits nonzero when any sub-test fails; only an empty
        // transcript counts as an invocation failure
        if stdout.trim().is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("diagnostic tool produced no output for {}", host),
            )
            .into());
        }

        Ok(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        assert_eq!(render_template("dcdiag /s:{host}", "dc01"), "dcdiag /s:dc01");
        assert_eq!(render_template("no placeholder", "dc01"), "no placeholder");
    }

    #[test]
    fn test_default_commands_cover_all_metrics() {
        let commands = ProbeCommands::default();
        for metric in Metric::ALL {
            assert!(
                commands.metrics.contains_key(&metric),
                "missing default command for {:?}",
                metric
            );
        }
        assert!(commands.diagnostics.contains("{host}"));
    }

    #[test]
    fn test_unreachable_host_fails_fast() {
        let commands = ProbeCommands {
            connect_timeout_secs: 1,
            ..Default::default()
        };
        let prober = CommandProber::new(commands);
        // Reserved TEST-NET-1 address: never routable
        assert!(!prober.check_reachable("192.0.2.1"));
    }

    #[test]
    fn test_comma_decimal_parses() {
        // Locales with comma decimal separators still yield a reading
        assert_eq!("12,5".replace(',', ".").parse::<f64>().unwrap(), 12.5);
    }
}
