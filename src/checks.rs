//! Named validation checks accumulated across pipeline stages.
//!
//! Every stage pushes its post-condition checks here, pass or fail, so the
//! run report always shows each assertion with its violation count. Fatal
//! failures abort the run before the output file is written; advisory
//! findings are reported and logged only.

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PrepError, Result};

/// How many offending keys a check result retains for display.
const MAX_DETAILS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckSeverity {
    /// Expected-and-tolerated condition; reported, never aborts.
    Advisory,
    /// Structural or semantic violation; aborts the run when nonzero.
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub name: String,
    pub severity: CheckSeverity,
    pub status: CheckStatus,
    pub violations: usize,
    /// Offending keys or rows, capped at the first few for readability.
    pub details: Vec<String>,
}

impl CheckResult {
    pub fn new(
        name: impl Into<String>,
        severity: CheckSeverity,
        violations: usize,
        mut details: Vec<String>,
    ) -> Self {
        let status = if violations == 0 {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        };
        if details.len() > MAX_DETAILS {
            let omitted = details.len() - MAX_DETAILS;
            details.truncate(MAX_DETAILS);
            details.push(format!("(+{} more)", omitted));
        }
        Self {
            name: name.into(),
            severity,
            status,
            violations,
            details,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckReport {
    pub checks: Vec<CheckResult>,
}

impl CheckReport {
    pub fn push(&mut self, check: CheckResult) {
        match check.status {
            CheckStatus::Pass => {
                info!(check = %check.name, "check passed");
            }
            CheckStatus::Fail => {
                warn!(
                    check = %check.name,
                    violations = check.violations,
                    details = ?check.details,
                    "check failed"
                );
            }
        }
        self.checks.push(check);
    }

    pub fn failed_fatal(&self) -> Vec<&CheckResult> {
        self.checks
            .iter()
            .filter(|c| c.severity == CheckSeverity::Fatal && c.status == CheckStatus::Fail)
            .collect()
    }

    /// Halt the pipeline if any fatal check has failed so far.
    pub fn ensure_clean(&self) -> Result<()> {
        let failed = self.failed_fatal();
        if failed.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = failed
            .iter()
            .map(|c| format!("{} ({} violations)", c.name, c.violations))
            .collect();
        Err(PrepError::Validation(names.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_report_passes() {
        let mut report = CheckReport::default();
        report.push(CheckResult::new("all_good", CheckSeverity::Fatal, 0, vec![]));
        assert!(report.ensure_clean().is_ok());
    }

    #[test]
    fn fatal_failure_halts() {
        let mut report = CheckReport::default();
        report.push(CheckResult::new(
            "trial_count",
            CheckSeverity::Fatal,
            2,
            vec!["S01".into(), "S02".into()],
        ));
        let err = report.ensure_clean().unwrap_err();
        assert!(err.to_string().contains("trial_count"));
    }

    #[test]
    fn advisory_failure_does_not_halt() {
        let mut report = CheckReport::default();
        report.push(CheckResult::new(
            "demo_only_subjects",
            CheckSeverity::Advisory,
            3,
            vec!["S09".into()],
        ));
        assert!(report.ensure_clean().is_ok());
    }

    #[test]
    fn details_are_capped() {
        let details: Vec<String> = (0..25).map(|i| format!("S{:02}", i)).collect();
        let check = CheckResult::new("big", CheckSeverity::Fatal, 25, details);
        assert_eq!(check.details.len(), 11);
        assert_eq!(check.details.last().unwrap(), "(+15 more)");
    }
}
