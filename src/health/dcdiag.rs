//! Parser for dcdiag-style diagnostic output
//!
//! dcdiag prints a free-text transcript whose phrasing follows the domain
//! controller's OS locale. The scanner below recognizes "test started" and
//! "test passed/failed" markers for an explicit list of locales (English and
//! German built in, more via `health.toml`) and folds the line stream into a
//! per-test outcome map.
//!
//! The commit rule: a status line is attributed to the most recently started
//! test name. Only when both a pending name and a pending status are held is
//! the pair committed, after which both slots clear. A later pair for the
//! same test name overwrites the earlier one.

use crate::error::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Outcome;

/// Phrase patterns for one diagnostic-tool locale, as stored in config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleSpec {
    pub name: String,
    /// Must contain one capture group for the test name
    pub test_started: String,
    pub test_passed: String,
    pub test_failed: String,
}

/// Compiled phrase patterns for one locale
#[derive(Debug, Clone)]
pub struct DiagLocale {
    pub name: String,
    test_started: Regex,
    test_passed: Regex,
    test_failed: Regex,
}

impl DiagLocale {
    pub fn from_spec(spec: &LocaleSpec) -> Result<Self> {
        Ok(Self {
            name: spec.name.clone(),
            test_started: Regex::new(&spec.test_started)?,
            test_passed: Regex::new(&spec.test_passed)?,
            test_failed: Regex::new(&spec.test_failed)?,
        })
    }

    pub fn english() -> Self {
        Self {
            name: "en".into(),
            test_started: Regex::new(r"^\s*Starting test:\s*(.+)$").unwrap(),
            test_passed: Regex::new(r"passed test").unwrap(),
            test_failed: Regex::new(r"failed test").unwrap(),
        }
    }

    pub fn german() -> Self {
        Self {
            name: "de".into(),
            test_started: Regex::new(r"^\s*Starte (?:Test|Überprüfung):\s*(.+)$").unwrap(),
            test_passed: Regex::new(r"(?:Test|Überprüfung)\s+\S+\s+bestanden").unwrap(),
            test_failed: Regex::new(r"nicht bestanden").unwrap(),
        }
    }

    /// The locales shipped by default
    pub fn builtin() -> Vec<Self> {
        vec![Self::english(), Self::german()]
    }
}

/// Transient scanner state: the two pending slots of the commit-on-pair rule
#[derive(Default)]
struct ScanState {
    pending_name: Option<String>,
    pending_status: Option<Outcome>,
}

impl ScanState {
    fn observe(&mut self, line: &str, locales: &[DiagLocale]) {
        for locale in locales {
            if let Some(caps) = locale.test_started.captures(line) {
                self.pending_name = Some(clean_test_name(&caps[1]));
                return;
            }
            // "nicht bestanden" contains "bestanden": failure first
            if locale.test_failed.is_match(line) {
                self.pending_status = Some(Outcome::Failed);
                return;
            }
            if locale.test_passed.is_match(line) {
                self.pending_status = Some(Outcome::Passed);
                return;
            }
        }
    }

    fn take_committed(&mut self) -> Option<(String, Outcome)> {
        if self.pending_name.is_some() && self.pending_status.is_some() {
            let name = self.pending_name.take()?;
            let status = self.pending_status.take()?;
            Some((name, status))
        } else {
            None
        }
    }
}

/// Strip trailing punctuation dcdiag appends to test identifiers
fn clean_test_name(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(['.', ':', ',', ' '])
        .to_string()
}

/// Scan a full tool transcript into outcomes for the requested sub-tests.
///
/// Every requested name is present in the result: names never matched in the
/// transcript resolve to [`Outcome::NoData`]. Names the transcript mentions
/// beyond the requested list are kept as well.
pub fn parse_diag_output(
    output: &str,
    requested: &[String],
    locales: &[DiagLocale],
) -> BTreeMap<String, Outcome> {
    let mut results: BTreeMap<String, Outcome> = requested
        .iter()
        .map(|name| (name.clone(), Outcome::NoData))
        .collect();

    let mut state = ScanState::default();
    for line in output.lines() {
        state.observe(line, locales);
        if let Some((name, status)) = state.take_committed() {
            results.insert(name, status);
        }
    }

    results
}

/// Outcomes for a host whose tool invocation failed outright
pub fn inaccessible_results(requested: &[String]) -> BTreeMap<String, Outcome> {
    requested
        .iter()
        .map(|name| (name.clone(), Outcome::Inaccessible))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_commit_on_pair() {
        let output = "\
Starting test: Foo
...... Foo passed test
Starting test: Bar
...... Bar failed test
";
        let results = parse_diag_output(output, &req(&["Foo", "Bar"]), &DiagLocale::builtin());
        assert_eq!(results["Foo"], Outcome::Passed);
        assert_eq!(results["Bar"], Outcome::Failed);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_realistic_dcdiag_transcript() {
        let output = "\
Directory Server Diagnosis

Performing initial setup:
   Trying to find home server...
   Home Server = DC01

Testing server: Default-First-Site-Name\\DC01
      Starting test: Connectivity
         ......................... DC01 passed test Connectivity

      Starting test: Replications
         [Replications Check,DC01] A recent replication attempt failed
         ......................... DC01 failed test Replications

      Starting test: Services
         ......................... DC01 passed test Services
";
        let requested = req(&["Connectivity", "Replications", "Services", "SysVolCheck"]);
        let results = parse_diag_output(output, &requested, &DiagLocale::builtin());
        assert_eq!(results["Connectivity"], Outcome::Passed);
        assert_eq!(results["Replications"], Outcome::Failed);
        assert_eq!(results["Services"], Outcome::Passed);
        // Never reported by the tool: no gap, explicit NoData
        assert_eq!(results["SysVolCheck"], Outcome::NoData);
    }

    #[test]
    fn test_german_locale() {
        let output = "\
      Starte Überprüfung: Connectivity
         ......................... DC01 hat den Test Connectivity bestanden.
      Starte Überprüfung: Replications
         ......................... DC01 hat den Test Replications nicht bestanden.
";
        let results = parse_diag_output(
            output,
            &req(&["Connectivity", "Replications"]),
            &DiagLocale::builtin(),
        );
        assert_eq!(results["Connectivity"], Outcome::Passed);
        assert_eq!(results["Replications"], Outcome::Failed);
    }

    #[test]
    fn test_unknown_locale_yields_no_data() {
        let output = "\
      Démarrage du test : Connectivity
         ......................... DC01 a réussi le test Connectivity.
";
        let results = parse_diag_output(output, &req(&["Connectivity"]), &DiagLocale::builtin());
        assert_eq!(results["Connectivity"], Outcome::NoData);
    }

    #[test]
    fn test_stray_status_pairs_with_next_start() {
        // A status line before any start marker sits in its slot until a
        // name arrives; the pair then commits and both slots clear
        let output = "\
...... something passed test
Starting test: Foo
...... Foo passed test
";
        let results = parse_diag_output(output, &req(&["Foo"]), &DiagLocale::builtin());
        assert_eq!(results.len(), 1);
        assert_eq!(results["Foo"], Outcome::Passed);
    }

    #[test]
    fn test_later_pair_overwrites() {
        let output = "\
Starting test: Foo
...... Foo failed test
Starting test: Foo
...... Foo passed test
";
        let results = parse_diag_output(output, &req(&["Foo"]), &DiagLocale::builtin());
        assert_eq!(results["Foo"], Outcome::Passed);
    }

    #[test]
    fn test_exactly_one_outcome_per_requested_name() {
        let output = "Starting test: A\n... A passed test\n";
        let requested = req(&["A", "B", "C"]);
        let results = parse_diag_output(output, &requested, &DiagLocale::builtin());
        assert_eq!(results.len(), 3);
        for name in &requested {
            assert!(results.contains_key(name));
        }
    }

    #[test]
    fn test_name_cleanup() {
        assert_eq!(clean_test_name("  Connectivity. "), "Connectivity");
        assert_eq!(clean_test_name("NetLogons:"), "NetLogons");
    }

    #[test]
    fn test_inaccessible_results() {
        let results = inaccessible_results(&req(&["Foo", "Bar"]));
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|o| *o == Outcome::Inaccessible));
    }

    #[test]
    fn test_custom_locale_from_spec() {
        let spec = LocaleSpec {
            name: "fr".into(),
            test_started: r"^\s*Démarrage du test\s*:\s*(.+)$".into(),
            test_passed: r"a réussi le test".into(),
            test_failed: r"a échoué au test".into(),
        };
        let locales = vec![DiagLocale::from_spec(&spec).unwrap()];
        let output = "\
Démarrage du test : Connectivity
...... DC01 a réussi le test Connectivity.
";
        let results = parse_diag_output(output, &req(&["Connectivity"]), &locales);
        assert_eq!(results["Connectivity"], Outcome::Passed);
    }
}
