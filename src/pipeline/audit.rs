//! Per-subject error-rate audit.
//!
//! Runs on the upstream correctness flag, the only signal available before
//! the reviser. High-error subjects are flagged for the downstream consumer
//! but never excluded here.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::config::AuditConfig;
use crate::domain::TrialFrame;

#[derive(Debug, Clone, Serialize)]
pub struct SubjectAudit {
    pub subject: String,
    pub trials: usize,
    pub errors: usize,
    pub error_rate: f64,
    pub flagged: bool,
}

pub fn audit_error_rates(frame: &TrialFrame, config: &AuditConfig) -> Vec<SubjectAudit> {
    let mut tallies: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for row in &frame.rows {
        let entry = tallies.entry(row.subject.as_str()).or_insert((0, 0));
        entry.0 += 1;
        if row.upstream_correct == 0 {
            entry.1 += 1;
        }
    }

    tallies
        .into_iter()
        .map(|(subject, (trials, errors))| {
            let error_rate = if trials == 0 {
                0.0
            } else {
                errors as f64 / trials as f64
            };
            let flagged = error_rate > config.error_rate_threshold;
            if flagged {
                warn!(subject, error_rate, "subject exceeds error-rate threshold");
            }
            SubjectAudit {
                subject: subject.to_string(),
                trials,
                errors,
                error_rate,
                flagged,
            }
        })
        .collect()
}
