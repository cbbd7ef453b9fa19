//! Demographic cleaning: political-orientation recoding and per-subject
//! deduplication (earliest survey submission wins).

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use tracing::info;

use crate::checks::{CheckReport, CheckResult, CheckSeverity};
use crate::domain::{DemographicFrame, DemographicRow};
use crate::error::{PrepError, Result};

/// The published 7-point scale, in rank order (1 = Extremely Liberal).
pub const POLITICAL_SCALE: [&str; 7] = [
    "Extremely Liberal",
    "Liberal",
    "Slightly Liberal",
    "Moderate",
    "Slightly Conservative",
    "Conservative",
    "Extremely Conservative",
];

static POLITICAL_RANKS: Lazy<HashMap<&'static str, u8>> = Lazy::new(|| {
    POLITICAL_SCALE
        .iter()
        .enumerate()
        .map(|(i, &label)| (label, i as u8 + 1))
        .collect()
});

/// Map a political-orientation label to its ordered rank 1-7. Anything
/// outside the published scale is an error, never a silent pass-through.
pub fn political_rank(label: &str) -> Result<u8> {
    POLITICAL_RANKS
        .get(label.trim())
        .copied()
        .ok_or_else(|| PrepError::PoliticalLabel(label.to_string()))
}

pub fn clean_demographics(frame: DemographicFrame, report: &mut CheckReport) -> DemographicFrame {
    let raw_rows = frame.rows.len();

    // Recode political orientation; collect unknown labels for the check.
    let mut unknown_labels = Vec::new();
    let mut recoded = Vec::with_capacity(raw_rows);
    for mut row in frame.rows {
        match political_rank(&row.political) {
            Ok(rank) => row.political_rank = Some(rank),
            Err(_) => unknown_labels.push(format!("{}: '{}'", row.subject, row.political)),
        }
        recoded.push(row);
    }
    report.push(CheckResult::new(
        "political_labels_known",
        CheckSeverity::Fatal,
        unknown_labels.len(),
        unknown_labels,
    ));

    // Per subject keep the chronologically earliest submission.
    let mut earliest: BTreeMap<String, DemographicRow> = BTreeMap::new();
    for row in recoded {
        match earliest.get(&row.subject) {
            Some(existing) if existing.session <= row.session => {}
            _ => {
                earliest.insert(row.subject.clone(), row);
            }
        }
    }
    let rows: Vec<DemographicRow> = earliest.into_values().collect();

    // Post-condition: one record per subject.
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    for row in &rows {
        *seen.entry(row.subject.as_str()).or_insert(0) += 1;
    }
    let duplicates: Vec<String> = seen
        .iter()
        .filter(|(_, &n)| n > 1)
        .map(|(s, n)| format!("{}: {} records", s, n))
        .collect();
    report.push(CheckResult::new(
        "one_demographic_per_subject",
        CheckSeverity::Fatal,
        duplicates.len(),
        duplicates,
    ));

    info!(
        raw_rows,
        subjects = rows.len(),
        "demographics cleaned"
    );
    DemographicFrame { rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(subject: &str, session: i64, political: &str) -> DemographicRow {
        DemographicRow {
            subject: subject.to_string(),
            session,
            gender: "female".to_string(),
            age: "21".to_string(),
            ethnicity: "white".to_string(),
            english: "native".to_string(),
            political: political.to_string(),
            political_rank: None,
        }
    }

    #[test]
    fn political_recoding_is_order_preserving_and_total() {
        let ranks: Vec<u8> = POLITICAL_SCALE
            .iter()
            .map(|label| political_rank(label).unwrap())
            .collect();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn unknown_label_is_rejected() {
        assert!(political_rank("Libertarian").is_err());
        assert!(political_rank("").is_err());
    }

    #[test]
    fn duplicate_subjects_resolve_to_earliest_session() {
        let frame = DemographicFrame {
            rows: vec![
                row("S01", 300, "Conservative"),
                row("S01", 100, "Liberal"),
                row("S02", 200, "Moderate"),
            ],
        };
        let mut report = CheckReport::default();
        let cleaned = clean_demographics(frame, &mut report);
        assert_eq!(cleaned.rows.len(), 2);
        let s01 = cleaned.rows.iter().find(|r| r.subject == "S01").unwrap();
        assert_eq!(s01.session, 100);
        assert_eq!(s01.political, "Liberal");
        assert_eq!(s01.political_rank, Some(2));
        assert!(report.ensure_clean().is_ok());
    }

    #[test]
    fn unknown_label_fails_the_check() {
        let frame = DemographicFrame {
            rows: vec![row("S01", 100, "Apolitical")],
        };
        let mut report = CheckReport::default();
        clean_demographics(frame, &mut report);
        assert!(report.ensure_clean().is_err());
    }
}
