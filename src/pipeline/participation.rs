//! Participation selection: one complete, first attempt per subject.
//!
//! A subject may appear under several session timestamps after restarting
//! the task. Only the chronologically first attempt counts, and only if it
//! reached the full trial count. A subject whose first attempt was
//! incomplete is excluded outright even when a later attempt completed;
//! those subjects are surfaced separately so the rule's impact stays
//! reviewable.

use std::collections::{BTreeMap, HashSet};

use tracing::{info, warn};

use crate::checks::{CheckReport, CheckResult, CheckSeverity};
use crate::config::SelectionConfig;
use crate::domain::TrialFrame;

#[derive(Debug)]
pub struct SelectionOutcome {
    pub frame: TrialFrame,
    pub subjects_seen: usize,
    pub sessions_seen: usize,
    pub retained_subjects: usize,
    pub excluded_subjects: usize,
    /// Excluded subjects that did complete a later attempt.
    pub complete_later_attempts: Vec<String>,
}

pub fn select_first_complete(
    frame: TrialFrame,
    config: &SelectionConfig,
    report: &mut CheckReport,
) -> SelectionOutcome {
    // subject -> session -> trial count, ordered on both levels
    let mut counts: BTreeMap<String, BTreeMap<i64, usize>> = BTreeMap::new();
    for row in &frame.rows {
        *counts
            .entry(row.subject.clone())
            .or_default()
            .entry(row.session)
            .or_insert(0) += 1;
    }

    let subjects_seen = counts.len();
    let sessions_seen = counts.values().map(|s| s.len()).sum();

    let mut retained: HashSet<(String, i64)> = HashSet::new();
    let mut complete_later_attempts = Vec::new();
    for (subject, sessions) in &counts {
        let (first_session, first_count) = sessions
            .iter()
            .next()
            .map(|(s, c)| (*s, *c))
            .unwrap_or((0, 0));
        if first_count == config.trials_per_session {
            retained.insert((subject.clone(), first_session));
        } else if sessions
            .values()
            .any(|&c| c == config.trials_per_session)
        {
            warn!(
                subject = %subject,
                first_count,
                "first attempt incomplete; later complete attempt discarded by rule"
            );
            complete_later_attempts.push(subject.clone());
        }
    }

    let retained_subjects = retained.len();
    let excluded_subjects = subjects_seen - retained_subjects;

    let rows: Vec<_> = frame
        .rows
        .into_iter()
        .filter(|r| retained.contains(&(r.subject.clone(), r.session)))
        .collect();

    let filtered = TrialFrame {
        headers: frame.headers,
        columns: frame.columns,
        rows,
    };

    // Post-conditions: 114 trials per surviving group, one session per subject.
    let mut group_counts: BTreeMap<(String, i64), usize> = BTreeMap::new();
    for row in &filtered.rows {
        *group_counts
            .entry((row.subject.clone(), row.session))
            .or_insert(0) += 1;
    }
    let bad_counts: Vec<String> = group_counts
        .iter()
        .filter(|(_, &c)| c != config.trials_per_session)
        .map(|((subject, session), c)| format!("{}@{}: {} trials", subject, session, c))
        .collect();
    report.push(CheckResult::new(
        "retained_session_trial_count",
        CheckSeverity::Fatal,
        bad_counts.len(),
        bad_counts,
    ));

    let mut sessions_per_subject: BTreeMap<&str, usize> = BTreeMap::new();
    for (subject, _) in group_counts.keys() {
        *sessions_per_subject.entry(subject.as_str()).or_insert(0) += 1;
    }
    let multi_session: Vec<String> = sessions_per_subject
        .iter()
        .filter(|(_, &n)| n > 1)
        .map(|(s, n)| format!("{}: {} sessions", s, n))
        .collect();
    report.push(CheckResult::new(
        "one_session_per_subject",
        CheckSeverity::Fatal,
        multi_session.len(),
        multi_session,
    ));

    info!(
        subjects_seen,
        sessions_seen,
        retained_subjects,
        excluded_subjects,
        retained_rows = filtered.rows.len(),
        "participation selection done"
    );

    SelectionOutcome {
        frame: filtered,
        subjects_seen,
        sessions_seen,
        retained_subjects,
        excluded_subjects,
        complete_later_attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TrialColumns, TrialRow};

    fn columns() -> TrialColumns {
        TrialColumns {
            subject: 0,
            session: 1,
            block: 2,
            condition: 3,
            trial_code: 4,
            response: 5,
            correct: 6,
            latency: 7,
        }
    }

    fn row(subject: &str, session: i64) -> TrialRow {
        TrialRow {
            subject: subject.to_string(),
            session,
            block: 1,
            condition: "IMM.CI.co".to_string(),
            trial_code: "stimxxmxxx".to_string(),
            response: 33,
            upstream_correct: 1,
            raw: vec![subject.to_string(), session.to_string()],
        }
    }

    fn frame(rows: Vec<TrialRow>) -> TrialFrame {
        TrialFrame {
            headers: vec!["subject".into(), "time".into()],
            columns: columns(),
            rows,
        }
    }

    fn config(n: usize) -> SelectionConfig {
        SelectionConfig {
            trials_per_session: n,
        }
    }

    #[test]
    fn keeps_only_complete_first_attempts() {
        let mut rows = Vec::new();
        // S01: complete first attempt, then a complete restart that must be dropped
        for _ in 0..3 {
            rows.push(row("S01", 100));
        }
        for _ in 0..3 {
            rows.push(row("S01", 200));
        }
        // S02: complete single attempt
        for _ in 0..3 {
            rows.push(row("S02", 150));
        }
        let mut report = CheckReport::default();
        let outcome = select_first_complete(frame(rows), &config(3), &mut report);
        assert_eq!(outcome.retained_subjects, 2);
        assert_eq!(outcome.frame.rows.len(), 6);
        assert!(outcome
            .frame
            .rows
            .iter()
            .all(|r| !(r.subject == "S01" && r.session == 200)));
        assert!(report.ensure_clean().is_ok());
    }

    #[test]
    fn incomplete_first_attempt_excludes_subject_entirely() {
        let mut rows = Vec::new();
        // First attempt short (2 of 3 trials), second attempt complete
        for _ in 0..2 {
            rows.push(row("S01", 100));
        }
        for _ in 0..3 {
            rows.push(row("S01", 200));
        }
        let mut report = CheckReport::default();
        let outcome = select_first_complete(frame(rows), &config(3), &mut report);
        assert_eq!(outcome.retained_subjects, 0);
        assert!(outcome.frame.rows.is_empty());
        assert_eq!(outcome.complete_later_attempts, vec!["S01".to_string()]);
    }

    #[test]
    fn never_complete_subject_is_dropped_quietly() {
        let rows = vec![row("S01", 100), row("S01", 100)];
        let mut report = CheckReport::default();
        let outcome = select_first_complete(frame(rows), &config(3), &mut report);
        assert_eq!(outcome.retained_subjects, 0);
        assert!(outcome.complete_later_attempts.is_empty());
    }
}
