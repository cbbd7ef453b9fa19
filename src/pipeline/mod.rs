//! The cleaning pipeline: a single-pass chain of immutable table
//! transformations, with validation checks asserted eagerly after each
//! stage that could introduce a violation.

pub mod audit;
pub mod correctness;
pub mod demographics;
pub mod design;
pub mod loader;
pub mod merge;
pub mod participation;
pub mod writer;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::checks::CheckReport;
use crate::config::Config;
use crate::error::Result;

use self::audit::SubjectAudit;

#[derive(Debug, Serialize)]
pub struct PipelineReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub raw_trial_rows: usize,
    pub subjects_seen: usize,
    pub sessions_seen: usize,
    pub retained_subjects: usize,
    pub retained_rows: usize,
    pub excluded_subjects: usize,
    /// Subjects excluded under the first-attempt-only rule despite having a
    /// complete later attempt; listed for domain-owner review.
    pub complete_later_attempts: Vec<String>,
    pub audits: Vec<SubjectAudit>,
    pub demographic_rows: usize,
    pub demographic_subjects: usize,
    pub output_rows: usize,
    pub checks: CheckReport,
}

pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all stages and write the merged table to `output`.
    pub fn run(
        &self,
        trials_path: &Path,
        demographics_path: &Path,
        output_path: &Path,
    ) -> Result<PipelineReport> {
        let started_at = Utc::now();
        let mut checks = CheckReport::default();

        let span = tracing::info_span!("pipeline_run");
        let _enter = span.enter();

        let raw_trials = loader::load_trials(trials_path)?;
        let raw_trial_rows = raw_trials.rows.len();

        let selection =
            participation::select_first_complete(raw_trials, &self.config.selection, &mut checks);
        checks.ensure_clean()?;
        let retained_rows = selection.frame.rows.len();

        let audits = audit::audit_error_rates(&selection.frame, &self.config.audit);

        let designed = design::derive_design(selection.frame, &mut checks);
        checks.ensure_clean()?;

        let revised = correctness::revise_correctness(designed, &self.config.keys, &mut checks);
        checks.ensure_clean()?;

        let raw_demographics = loader::load_demographics(demographics_path)?;
        let demographic_rows = raw_demographics.rows.len();
        let cleaned_demographics = demographics::clean_demographics(raw_demographics, &mut checks);
        checks.ensure_clean()?;
        let demographic_subjects = cleaned_demographics.rows.len();

        let merged = merge::merge(revised, &cleaned_demographics, &mut checks);
        checks.ensure_clean()?;

        let output_rows = writer::write_output(&merged, output_path)?;

        let finished_at = Utc::now();
        info!(output_rows, "pipeline finished");
        Ok(PipelineReport {
            started_at,
            finished_at,
            raw_trial_rows,
            subjects_seen: selection.subjects_seen,
            sessions_seen: selection.sessions_seen,
            retained_subjects: selection.retained_subjects,
            retained_rows,
            excluded_subjects: selection.excluded_subjects,
            complete_later_attempts: selection.complete_later_attempts,
            audits,
            demographic_rows,
            demographic_subjects,
            output_rows,
            checks,
        })
    }

    /// Run stages 1-3 only and return the per-subject error-rate audit.
    pub fn run_audit(&self, trials_path: &Path) -> Result<(Vec<SubjectAudit>, CheckReport)> {
        let mut checks = CheckReport::default();
        let raw_trials = loader::load_trials(trials_path)?;
        let selection =
            participation::select_first_complete(raw_trials, &self.config.selection, &mut checks);
        checks.ensure_clean()?;
        let audits = audit::audit_error_rates(&selection.frame, &self.config.audit);
        Ok((audits, checks))
    }
}
