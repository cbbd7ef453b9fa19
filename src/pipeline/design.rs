//! Design-variable derivation from the condition and trial code strings.
//!
//! The condition code is a fixed-layout string; each field below reads a
//! fixed 1-indexed character range out of it:
//!
//!   chars 1-3  side mapping      "IMM" -> immoral-left, else moral-left
//!   chars 5-6  block order       "CI" -> congruent-first, else incongruent-first
//!   chars 8-9  distractor words  "co" -> color, else vain
//!
//! Congruency is a joint function of chars 5-6 and the block bucket
//! (1-3 vs 4-6). The trial code carries the target category at a
//! block-bucket-dependent offset. Each field has its own pure decoder so
//! the magic offsets stay independently testable.

use std::collections::BTreeMap;

use tracing::info;

use crate::checks::{CheckReport, CheckResult, CheckSeverity};
use crate::domain::{
    BlockOrder, Congruency, DistractorKind, SideMapping, TargetCategory, TrialColumns, TrialFrame,
    TrialRow,
};
use crate::error::{PrepError, Result};

pub fn decode_side(condition: &str) -> Result<SideMapping> {
    match condition.get(0..3) {
        Some("IMM") => Ok(SideMapping::ImmoralLeft),
        Some(_) => Ok(SideMapping::MoralLeft),
        None => Err(PrepError::ConditionCode(condition.to_string())),
    }
}

pub fn decode_distractor(condition: &str) -> Result<DistractorKind> {
    match condition.get(7..9) {
        Some("co") => Ok(DistractorKind::Color),
        Some(_) => Ok(DistractorKind::Vain),
        None => Err(PrepError::ConditionCode(condition.to_string())),
    }
}

pub fn decode_block_order(condition: &str) -> Result<BlockOrder> {
    match condition.get(4..6) {
        Some("CI") => Ok(BlockOrder::CongruentFirst),
        Some(_) => Ok(BlockOrder::IncongruentFirst),
        None => Err(PrepError::ConditionCode(condition.to_string())),
    }
}

pub fn decode_congruency(condition: &str, block: u8) -> Result<Congruency> {
    let chars = condition
        .get(4..6)
        .ok_or_else(|| PrepError::ConditionCode(condition.to_string()))?;
    let first_half = match block {
        1..=3 => true,
        4..=6 => false,
        _ => {
            return Err(PrepError::CongruencyUndefined {
                chars: chars.to_string(),
                block,
            })
        }
    };
    match (chars, first_half) {
        ("CI", true) | ("IC", false) => Ok(Congruency::Congruent),
        ("CI", false) | ("IC", true) => Ok(Congruency::Incongruent),
        _ => Err(PrepError::CongruencyUndefined {
            chars: chars.to_string(),
            block,
        }),
    }
}

/// 0-indexed offset of the target character within the trial code.
fn target_offset(block: u8) -> Option<usize> {
    match block {
        1 | 4 => Some(6),
        2 | 5 => Some(8),
        3 | 6 => Some(7),
        _ => None,
    }
}

pub fn decode_target(trial_code: &str, block: u8) -> Result<TargetCategory> {
    let offset = target_offset(block).ok_or_else(|| PrepError::TrialCode {
        code: trial_code.to_string(),
        block,
    })?;
    let ch = trial_code
        .chars()
        .nth(offset)
        .ok_or_else(|| PrepError::TrialCode {
            code: trial_code.to_string(),
            block,
        })?;
    Ok(match ch {
        'm' => TargetCategory::Moral,
        'i' => TargetCategory::Immoral,
        'a' => TargetCategory::Attractive,
        _ => TargetCategory::Distractor,
    })
}

/// One trial annotated with its derived design variables.
#[derive(Debug, Clone)]
pub struct DesignRow {
    pub trial: TrialRow,
    pub side: SideMapping,
    pub distractor: DistractorKind,
    pub order: BlockOrder,
    pub congruency: Congruency,
    pub target: TargetCategory,
}

#[derive(Debug, Clone)]
pub struct DesignFrame {
    pub headers: Vec<String>,
    pub columns: TrialColumns,
    pub rows: Vec<DesignRow>,
}

type Decoded = (
    SideMapping,
    DistractorKind,
    BlockOrder,
    Congruency,
    TargetCategory,
);

fn decode_trial(trial: &TrialRow) -> Result<Decoded> {
    Ok((
        decode_side(&trial.condition)?,
        decode_distractor(&trial.condition)?,
        decode_block_order(&trial.condition)?,
        decode_congruency(&trial.condition, trial.block)?,
        decode_target(&trial.trial_code, trial.block)?,
    ))
}

pub fn derive_design(frame: TrialFrame, report: &mut CheckReport) -> DesignFrame {
    let mut rows = Vec::with_capacity(frame.rows.len());
    let mut decode_failures = Vec::new();

    for trial in frame.rows {
        match decode_trial(&trial) {
            Ok((side, distractor, order, congruency, target)) => rows.push(DesignRow {
                trial,
                side,
                distractor,
                order,
                congruency,
                target,
            }),
            Err(e) => decode_failures.push(format!("{}@{}: {}", trial.subject, trial.session, e)),
        }
    }

    report.push(CheckResult::new(
        "design_codes_decodable",
        CheckSeverity::Fatal,
        decode_failures.len(),
        decode_failures,
    ));

    // Within a subject-session, blocks 1-3 and 4-6 must carry exactly one
    // congruency label each, and the two labels must be opposite.
    let mut halves: BTreeMap<(String, i64), [Vec<Congruency>; 2]> = BTreeMap::new();
    for row in &rows {
        let entry = halves
            .entry((row.trial.subject.clone(), row.trial.session))
            .or_default();
        let half = if row.trial.block <= 3 { 0 } else { 1 };
        if !entry[half].contains(&row.congruency) {
            entry[half].push(row.congruency);
        }
    }
    let split_violations: Vec<String> = halves
        .iter()
        .filter(|(_, [first, second])| {
            first.len() != 1 || second.len() != 1 || first[0] == second[0]
        })
        .map(|((subject, session), _)| format!("{}@{}", subject, session))
        .collect();
    report.push(CheckResult::new(
        "congruency_block_split",
        CheckSeverity::Fatal,
        split_violations.len(),
        split_violations,
    ));

    info!(rows = rows.len(), "design variables derived");
    DesignFrame {
        headers: frame.headers,
        columns: frame.columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_mapping_from_condition_prefix() {
        assert_eq!(decode_side("IMM.CI.co").unwrap(), SideMapping::ImmoralLeft);
        assert_eq!(decode_side("MOR.IC.va").unwrap(), SideMapping::MoralLeft);
        assert!(decode_side("IM").is_err());
    }

    #[test]
    fn distractor_kind_from_condition() {
        assert_eq!(decode_distractor("IMM.CI.co").unwrap(), DistractorKind::Color);
        assert_eq!(decode_distractor("IMM.CI.va").unwrap(), DistractorKind::Vain);
    }

    #[test]
    fn block_order_from_condition() {
        assert_eq!(
            decode_block_order("IMM.CI.co").unwrap(),
            BlockOrder::CongruentFirst
        );
        assert_eq!(
            decode_block_order("IMM.IC.co").unwrap(),
            BlockOrder::IncongruentFirst
        );
    }

    #[test]
    fn congruency_flips_between_block_halves() {
        for block in 1..=3u8 {
            assert_eq!(
                decode_congruency("IMM.CI.co", block).unwrap(),
                Congruency::Congruent
            );
            assert_eq!(
                decode_congruency("IMM.IC.co", block).unwrap(),
                Congruency::Incongruent
            );
        }
        for block in 4..=6u8 {
            assert_eq!(
                decode_congruency("IMM.CI.co", block).unwrap(),
                Congruency::Incongruent
            );
            assert_eq!(
                decode_congruency("IMM.IC.co", block).unwrap(),
                Congruency::Congruent
            );
        }
    }

    #[test]
    fn congruency_rejects_unknown_order_chars_and_blocks() {
        assert!(decode_congruency("IMM.XX.co", 1).is_err());
        assert!(decode_congruency("IMM.CI.co", 7).is_err());
        assert!(decode_congruency("IMM.CI.co", 0).is_err());
    }

    #[test]
    fn target_offset_depends_on_block() {
        // Offsets are 1-indexed 7 / 9 / 8 for block buckets 1,4 / 2,5 / 3,6.
        assert_eq!(decode_target("xxxxxxmZZ", 1).unwrap(), TargetCategory::Moral);
        assert_eq!(decode_target("xxxxxxmZZ", 4).unwrap(), TargetCategory::Moral);
        assert_eq!(
            decode_target("xxxxxxZZi", 2).unwrap(),
            TargetCategory::Immoral
        );
        assert_eq!(
            decode_target("xxxxxxZZi", 5).unwrap(),
            TargetCategory::Immoral
        );
        assert_eq!(
            decode_target("xxxxxxZaZ", 3).unwrap(),
            TargetCategory::Attractive
        );
        assert_eq!(
            decode_target("xxxxxxZaZ", 6).unwrap(),
            TargetCategory::Attractive
        );
    }

    #[test]
    fn unknown_target_char_is_distractor() {
        assert_eq!(
            decode_target("xxxxxxwZZ", 1).unwrap(),
            TargetCategory::Distractor
        );
    }

    #[test]
    fn short_trial_code_is_an_error() {
        assert!(decode_target("xxx", 1).is_err());
    }
}
