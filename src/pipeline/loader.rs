//! CSV loading for the two raw inputs.
//!
//! The trial loader keeps the full raw record next to the typed view so
//! every logged column (latency included) passes through to the output
//! unchanged. Session identifiers are integer timestamps; a non-numeric
//! value is a load-time error, not something to guess around.

use std::path::Path;

use tracing::info;

use crate::domain::{DemographicFrame, DemographicRow, TrialColumns, TrialFrame, TrialRow};
use crate::error::{PrepError, Result};

// Required trial-file column names.
const COL_SUBJECT: &str = "subject";
const COL_TIME: &str = "time";
const COL_BLOCK: &str = "blocknum";
const COL_CONDITION: &str = "condition";
const COL_TRIAL_CODE: &str = "trialcode";
const COL_RESPONSE: &str = "response";
const COL_CORRECT: &str = "correct";
const COL_LATENCY: &str = "latency";

// Required demographic-file column names.
const COL_GENDER: &str = "gender";
const COL_AGE: &str = "age";
const COL_ETHNICITY: &str = "ethnicity";
const COL_ENGLISH: &str = "english";
const COL_POLITICAL: &str = "political";

fn column_index(headers: &[String], name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| PrepError::MissingColumn(name.to_string()))
}

fn parse_field<T: std::str::FromStr>(value: &str, row: usize, column: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| PrepError::BadField {
        row,
        column: column.to_string(),
        reason: format!("'{}': {}", value, e),
    })
}

pub fn load_trials(path: &Path) -> Result<TrialFrame> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let columns = TrialColumns {
        subject: column_index(&headers, COL_SUBJECT)?,
        session: column_index(&headers, COL_TIME)?,
        block: column_index(&headers, COL_BLOCK)?,
        condition: column_index(&headers, COL_CONDITION)?,
        trial_code: column_index(&headers, COL_TRIAL_CODE)?,
        response: column_index(&headers, COL_RESPONSE)?,
        correct: column_index(&headers, COL_CORRECT)?,
        latency: column_index(&headers, COL_LATENCY)?,
    };

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1; data rows start at line 2.
        let line = i + 2;
        let raw: Vec<String> = record.iter().map(String::from).collect();
        rows.push(TrialRow {
            subject: raw[columns.subject].trim().to_string(),
            session: parse_field(&raw[columns.session], line, COL_TIME)?,
            block: parse_field(&raw[columns.block], line, COL_BLOCK)?,
            condition: raw[columns.condition].trim().to_string(),
            trial_code: raw[columns.trial_code].trim().to_string(),
            response: parse_field(&raw[columns.response], line, COL_RESPONSE)?,
            upstream_correct: parse_field(&raw[columns.correct], line, COL_CORRECT)?,
            raw,
        });
    }

    info!(rows = rows.len(), file = %path.display(), "loaded trial records");
    Ok(TrialFrame {
        headers,
        columns,
        rows,
    })
}

pub fn load_demographics(path: &Path) -> Result<DemographicFrame> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let subject = column_index(&headers, COL_SUBJECT)?;
    let session = column_index(&headers, COL_TIME)?;
    let gender = column_index(&headers, COL_GENDER)?;
    let age = column_index(&headers, COL_AGE)?;
    let ethnicity = column_index(&headers, COL_ETHNICITY)?;
    let english = column_index(&headers, COL_ENGLISH)?;
    let political = column_index(&headers, COL_POLITICAL)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let line = i + 2;
        rows.push(DemographicRow {
            subject: record[subject].trim().to_string(),
            session: parse_field(&record[session], line, COL_TIME)?,
            gender: record[gender].trim().to_string(),
            age: record[age].trim().to_string(),
            ethnicity: record[ethnicity].trim().to_string(),
            english: record[english].trim().to_string(),
            political: record[political].trim().to_string(),
            political_rank: None,
        });
    }

    info!(rows = rows.len(), file = %path.display(), "loaded demographic records");
    Ok(DemographicFrame { rows })
}
