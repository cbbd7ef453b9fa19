//! Shared data shapes for the cleaning pipeline.

use serde::{Deserialize, Serialize};

/// Which physical key is bound to "moral" responses for a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SideMapping {
    MoralLeft,
    ImmoralLeft,
}

impl SideMapping {
    /// The 0/1 `moralleft` flag carried into the output table.
    pub fn flag(self) -> u8 {
        match self {
            SideMapping::MoralLeft => 1,
            SideMapping::ImmoralLeft => 0,
        }
    }
}

/// Category of the distractor words used in a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistractorKind {
    Color,
    Vain,
}

impl DistractorKind {
    pub fn label(self) -> &'static str {
        match self {
            DistractorKind::Color => "color",
            DistractorKind::Vain => "vain",
        }
    }
}

/// Whether the congruent or incongruent blocks came first for a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockOrder {
    CongruentFirst,
    IncongruentFirst,
}

impl BlockOrder {
    pub fn label(self) -> &'static str {
        match self {
            BlockOrder::CongruentFirst => "cFirst",
            BlockOrder::IncongruentFirst => "iFirst",
        }
    }
}

/// Congruency of a single block: whether the morality and attractiveness
/// key mappings coincide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Congruency {
    Congruent,
    Incongruent,
}

impl Congruency {
    pub fn label(self) -> &'static str {
        match self {
            Congruency::Congruent => "c",
            Congruency::Incongruent => "i",
        }
    }
}

/// Stimulus category of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetCategory {
    Moral,
    Immoral,
    Attractive,
    Distractor,
}

impl TargetCategory {
    pub fn label(self) -> &'static str {
        match self {
            TargetCategory::Moral => "moral",
            TargetCategory::Immoral => "immoral",
            TargetCategory::Attractive => "attractive",
            TargetCategory::Distractor => "distractor",
        }
    }
}

/// The three response keys a trial can be answered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKey {
    Left,
    Right,
    Space,
}

/// Column indices of the required trial fields within the raw CSV record.
#[derive(Debug, Clone, Copy)]
pub struct TrialColumns {
    pub subject: usize,
    pub session: usize,
    pub block: usize,
    pub condition: usize,
    pub trial_code: usize,
    pub response: usize,
    pub correct: usize,
    pub latency: usize,
}

/// One trial row: the typed fields the pipeline operates on plus the full
/// raw record, kept so every logged column passes through to the output
/// untouched (latency included).
#[derive(Debug, Clone)]
pub struct TrialRow {
    pub subject: String,
    pub session: i64,
    pub block: u8,
    pub condition: String,
    pub trial_code: String,
    pub response: u16,
    pub upstream_correct: u8,
    pub raw: Vec<String>,
}

/// An immutable trial table: headers, column mapping, and rows.
#[derive(Debug, Clone)]
pub struct TrialFrame {
    pub headers: Vec<String>,
    pub columns: TrialColumns,
    pub rows: Vec<TrialRow>,
}

impl TrialFrame {
    pub fn distinct_subjects(&self) -> usize {
        let mut subjects: Vec<&str> = self.rows.iter().map(|r| r.subject.as_str()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        subjects.len()
    }
}

/// One demographic survey row, already reduced to the retained columns.
#[derive(Debug, Clone, Serialize)]
pub struct DemographicRow {
    pub subject: String,
    pub session: i64,
    pub gender: String,
    pub age: String,
    pub ethnicity: String,
    pub english: String,
    pub political: String,
    /// Ordered rank 1-7 derived from `political`; filled by the cleaner.
    pub political_rank: Option<u8>,
}

#[derive(Debug, Clone)]
pub struct DemographicFrame {
    pub rows: Vec<DemographicRow>,
}
