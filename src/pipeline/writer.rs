//! Output writer: one CSV row per retained trial, original columns first
//! (with the correctness flag replaced by the revised value), then the
//! derived design columns, then the demographic columns. The demographic
//! session column is written as `demo_time` to avoid colliding with the
//! trial `time` column.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::pipeline::merge::MergedFrame;

pub const DERIVED_HEADERS: [&str; 5] = [
    "moralleft",
    "distractor_cat",
    "block_order",
    "congruency",
    "target",
];

pub const DEMOGRAPHIC_HEADERS: [&str; 7] = [
    "demo_time",
    "gender",
    "age",
    "ethnicity",
    "english",
    "political",
    "political_rank",
];

pub fn write_output(frame: &MergedFrame, path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)?;

    let mut headers: Vec<&str> = frame.headers.iter().map(String::as_str).collect();
    headers.extend(DERIVED_HEADERS);
    headers.extend(DEMOGRAPHIC_HEADERS);
    writer.write_record(&headers)?;

    let correct_idx = frame.columns.correct;
    for row in &frame.rows {
        let mut record: Vec<String> = row.revised.trial.raw.clone();
        record[correct_idx] = row.revised.correct.to_string();

        record.push(row.revised.side.flag().to_string());
        record.push(row.revised.distractor.label().to_string());
        record.push(row.revised.order.label().to_string());
        record.push(row.revised.congruency.label().to_string());
        record.push(row.revised.target.label().to_string());

        match &row.demo {
            Some(demo) => {
                record.push(demo.session.to_string());
                record.push(demo.gender.clone());
                record.push(demo.age.clone());
                record.push(demo.ethnicity.clone());
                record.push(demo.english.clone());
                record.push(demo.political.clone());
                record.push(
                    demo.political_rank
                        .map(|r| r.to_string())
                        .unwrap_or_default(),
                );
            }
            None => {
                for _ in 0..DEMOGRAPHIC_HEADERS.len() {
                    record.push(String::new());
                }
            }
        }

        writer.write_record(&record)?;
    }
    writer.flush()?;

    info!(rows = frame.rows.len(), file = %path.display(), "output written");
    Ok(frame.rows.len())
}
