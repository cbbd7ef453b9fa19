//! Left join of revised trial data with cleaned demographics on subject.
//!
//! Trial rows are the authoritative side: every retained trial appears in
//! the merged table exactly once, and demographic-only subjects drop out by
//! construction. The demographic session column is renamed downstream so it
//! cannot silently overwrite the trial session column.

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use crate::checks::{CheckReport, CheckResult, CheckSeverity};
use crate::domain::{DemographicFrame, DemographicRow, TrialColumns};
use crate::pipeline::correctness::{RevisedFrame, RevisedRow};

#[derive(Debug, Clone)]
pub struct MergedRow {
    pub revised: RevisedRow,
    pub demo: Option<DemographicRow>,
}

#[derive(Debug, Clone)]
pub struct MergedFrame {
    pub headers: Vec<String>,
    pub columns: TrialColumns,
    pub rows: Vec<MergedRow>,
}

pub fn merge(
    trials: RevisedFrame,
    demographics: &DemographicFrame,
    report: &mut CheckReport,
) -> MergedFrame {
    let trial_rows = trials.rows.len();
    let trial_subjects: BTreeSet<String> = trials
        .rows
        .iter()
        .map(|r| r.trial.subject.clone())
        .collect();

    let by_subject: HashMap<&str, &DemographicRow> = demographics
        .rows
        .iter()
        .map(|r| (r.subject.as_str(), r))
        .collect();

    // Demographic-only subjects: known, tolerated, reported.
    let demo_only: Vec<String> = demographics
        .rows
        .iter()
        .filter(|r| !trial_subjects.contains(&r.subject))
        .map(|r| r.subject.clone())
        .collect();
    report.push(CheckResult::new(
        "demographic_only_subjects",
        CheckSeverity::Advisory,
        demo_only.len(),
        demo_only,
    ));

    let rows: Vec<MergedRow> = trials
        .rows
        .into_iter()
        .map(|revised| {
            let demo = by_subject
                .get(revised.trial.subject.as_str())
                .map(|&r| r.clone());
            MergedRow { revised, demo }
        })
        .collect();

    // Cardinality invariants: the join must neither drop nor duplicate rows.
    let row_count_delta = if rows.len() == trial_rows {
        vec![]
    } else {
        vec![format!("{} trial rows -> {} merged rows", trial_rows, rows.len())]
    };
    report.push(CheckResult::new(
        "merge_preserves_row_count",
        CheckSeverity::Fatal,
        row_count_delta.len(),
        row_count_delta,
    ));

    let merged_subjects: BTreeSet<&str> = rows
        .iter()
        .map(|r| r.revised.trial.subject.as_str())
        .collect();
    let subject_delta = if merged_subjects.len() == trial_subjects.len() {
        vec![]
    } else {
        vec![format!(
            "{} trial subjects -> {} merged subjects",
            trial_subjects.len(),
            merged_subjects.len()
        )]
    };
    report.push(CheckResult::new(
        "merge_preserves_subject_count",
        CheckSeverity::Fatal,
        subject_delta.len(),
        subject_delta,
    ));

    let with_demo = rows.iter().filter(|r| r.demo.is_some()).count();
    info!(
        rows = rows.len(),
        with_demographics = with_demo,
        "merge complete"
    );
    MergedFrame {
        headers: trials.headers,
        columns: trials.columns,
        rows,
    }
}
