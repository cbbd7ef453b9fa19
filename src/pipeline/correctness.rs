//! Correctness revision from stimulus/response/key-mapping facts.
//!
//! The upstream `correct` flag is unreliable (spacebar responses on
//! distractor trials were sometimes marked incorrect), so it is discarded
//! and rebuilt from the decision table below. Rules are matched in order,
//! first match wins, and anything unmatched is incorrect. `None` in a rule
//! means "any value".

use tracing::info;

use crate::checks::{CheckReport, CheckResult, CheckSeverity};
use crate::config::KeyCodes;
use crate::domain::{
    BlockOrder, Congruency, DistractorKind, ResponseKey, SideMapping, TargetCategory, TrialColumns,
    TrialRow,
};
use crate::pipeline::design::{DesignFrame, DesignRow};

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub target: TargetCategory,
    pub side: Option<SideMapping>,
    pub congruency: Option<Congruency>,
    pub response: ResponseKey,
}

/// The full decision table. Every row here maps to revised-correct = 1;
/// the implicit final rule maps everything else to 0.
pub const CORRECT_RULES: [Rule; 9] = [
    Rule {
        target: TargetCategory::Distractor,
        side: None,
        congruency: None,
        response: ResponseKey::Space,
    },
    Rule {
        target: TargetCategory::Moral,
        side: Some(SideMapping::MoralLeft),
        congruency: None,
        response: ResponseKey::Left,
    },
    Rule {
        target: TargetCategory::Immoral,
        side: Some(SideMapping::MoralLeft),
        congruency: None,
        response: ResponseKey::Right,
    },
    Rule {
        target: TargetCategory::Moral,
        side: Some(SideMapping::ImmoralLeft),
        congruency: None,
        response: ResponseKey::Right,
    },
    Rule {
        target: TargetCategory::Immoral,
        side: Some(SideMapping::ImmoralLeft),
        congruency: None,
        response: ResponseKey::Left,
    },
    Rule {
        target: TargetCategory::Attractive,
        side: Some(SideMapping::MoralLeft),
        congruency: Some(Congruency::Congruent),
        response: ResponseKey::Left,
    },
    Rule {
        target: TargetCategory::Attractive,
        side: Some(SideMapping::MoralLeft),
        congruency: Some(Congruency::Incongruent),
        response: ResponseKey::Right,
    },
    Rule {
        target: TargetCategory::Attractive,
        side: Some(SideMapping::ImmoralLeft),
        congruency: Some(Congruency::Congruent),
        response: ResponseKey::Right,
    },
    Rule {
        target: TargetCategory::Attractive,
        side: Some(SideMapping::ImmoralLeft),
        congruency: Some(Congruency::Incongruent),
        response: ResponseKey::Left,
    },
];

/// Classify one trial against the decision table.
pub fn revised_correct(
    target: TargetCategory,
    side: SideMapping,
    congruency: Congruency,
    key: Option<ResponseKey>,
) -> u8 {
    let key = match key {
        Some(k) => k,
        // A response code outside the three known keys cannot be correct.
        None => return 0,
    };
    for rule in &CORRECT_RULES {
        if rule.target == target
            && rule.side.map_or(true, |s| s == side)
            && rule.congruency.map_or(true, |c| c == congruency)
            && rule.response == key
        {
            return 1;
        }
    }
    0
}

/// A trial with derived design variables and the rebuilt correctness flag.
#[derive(Debug, Clone)]
pub struct RevisedRow {
    pub trial: TrialRow,
    pub side: SideMapping,
    pub distractor: DistractorKind,
    pub order: BlockOrder,
    pub congruency: Congruency,
    pub target: TargetCategory,
    pub key: Option<ResponseKey>,
    pub correct: u8,
}

#[derive(Debug, Clone)]
pub struct RevisedFrame {
    pub headers: Vec<String>,
    pub columns: TrialColumns,
    pub rows: Vec<RevisedRow>,
}

impl RevisedFrame {
    pub fn distinct_subjects(&self) -> usize {
        let mut subjects: Vec<&str> = self.rows.iter().map(|r| r.trial.subject.as_str()).collect();
        subjects.sort_unstable();
        subjects.dedup();
        subjects.len()
    }
}

pub fn revise_correctness(
    frame: DesignFrame,
    keys: &KeyCodes,
    report: &mut CheckReport,
) -> RevisedFrame {
    let mut rows = Vec::with_capacity(frame.rows.len());
    let mut unknown_codes = Vec::new();
    let mut revised_total = 0usize;
    let mut disagreements = 0usize;

    for row in frame.rows {
        let DesignRow {
            trial,
            side,
            distractor,
            order,
            congruency,
            target,
        } = row;
        let key = keys.classify(trial.response);
        if key.is_none() {
            unknown_codes.push(format!(
                "{}@{}: response code {}",
                trial.subject, trial.session, trial.response
            ));
        }
        let correct = revised_correct(target, side, congruency, key);
        revised_total += 1;
        if correct != trial.upstream_correct {
            disagreements += 1;
        }
        rows.push(RevisedRow {
            trial,
            side,
            distractor,
            order,
            congruency,
            target,
            key,
            correct,
        });
    }

    report.push(CheckResult::new(
        "recognized_response_codes",
        CheckSeverity::Advisory,
        unknown_codes.len(),
        unknown_codes,
    ));

    cross_check(&rows, report);

    info!(
        rows = revised_total,
        upstream_disagreements = disagreements,
        "correctness flags revised"
    );
    RevisedFrame {
        headers: frame.headers,
        columns: frame.columns,
        rows,
    }
}

/// Re-verify the three rule families against the revised flag. Each family
/// must show zero violations on valid data; nonzero means the decoding or
/// the input is broken, and the pipeline halts before the merge.
fn cross_check(rows: &[RevisedRow], report: &mut CheckReport) {
    let mut distractor_violations = Vec::new();
    let mut mapping_violations = Vec::new();
    let mut attractive_violations = Vec::new();

    for row in rows {
        let locator = || format!("{}@{}", row.trial.subject, row.trial.session);
        match row.target {
            TargetCategory::Distractor => {
                let expected = u8::from(row.key == Some(ResponseKey::Space));
                if row.correct != expected {
                    distractor_violations.push(locator());
                }
            }
            TargetCategory::Moral | TargetCategory::Immoral => {
                let moral_key = match row.side {
                    SideMapping::MoralLeft => ResponseKey::Left,
                    SideMapping::ImmoralLeft => ResponseKey::Right,
                };
                let required = if row.target == TargetCategory::Moral {
                    moral_key
                } else {
                    opposite(moral_key)
                };
                let expected = u8::from(row.key == Some(required));
                if row.correct != expected {
                    mapping_violations.push(locator());
                }
            }
            TargetCategory::Attractive => {
                let moral_key = match row.side {
                    SideMapping::MoralLeft => ResponseKey::Left,
                    SideMapping::ImmoralLeft => ResponseKey::Right,
                };
                // On congruent blocks the attractive key coincides with the
                // moral key; on incongruent blocks it is the opposite.
                let required = match row.congruency {
                    Congruency::Congruent => moral_key,
                    Congruency::Incongruent => opposite(moral_key),
                };
                let expected = u8::from(row.key == Some(required));
                if row.correct != expected {
                    attractive_violations.push(locator());
                }
            }
        }
    }

    report.push(CheckResult::new(
        "distractor_spacebar_rule",
        CheckSeverity::Fatal,
        distractor_violations.len(),
        distractor_violations,
    ));
    report.push(CheckResult::new(
        "moral_key_mapping_rule",
        CheckSeverity::Fatal,
        mapping_violations.len(),
        mapping_violations,
    ));
    report.push(CheckResult::new(
        "attractive_congruency_rule",
        CheckSeverity::Fatal,
        attractive_violations.len(),
        attractive_violations,
    ));
}

fn opposite(key: ResponseKey) -> ResponseKey {
    match key {
        ResponseKey::Left => ResponseKey::Right,
        ResponseKey::Right => ResponseKey::Left,
        ResponseKey::Space => ResponseKey::Space,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distractor_spacebar_is_correct_regardless_of_mapping() {
        for side in [SideMapping::MoralLeft, SideMapping::ImmoralLeft] {
            for congruency in [Congruency::Congruent, Congruency::Incongruent] {
                assert_eq!(
                    revised_correct(
                        TargetCategory::Distractor,
                        side,
                        congruency,
                        Some(ResponseKey::Space)
                    ),
                    1
                );
            }
        }
    }

    #[test]
    fn moral_left_mapping() {
        // moralleft flag 1: moral -> left key, immoral -> right key
        assert_eq!(
            revised_correct(
                TargetCategory::Moral,
                SideMapping::MoralLeft,
                Congruency::Congruent,
                Some(ResponseKey::Left)
            ),
            1
        );
        assert_eq!(
            revised_correct(
                TargetCategory::Moral,
                SideMapping::MoralLeft,
                Congruency::Congruent,
                Some(ResponseKey::Right)
            ),
            0
        );
        assert_eq!(
            revised_correct(
                TargetCategory::Immoral,
                SideMapping::MoralLeft,
                Congruency::Incongruent,
                Some(ResponseKey::Right)
            ),
            1
        );
    }

    #[test]
    fn immoral_left_mapping() {
        assert_eq!(
            revised_correct(
                TargetCategory::Moral,
                SideMapping::ImmoralLeft,
                Congruency::Congruent,
                Some(ResponseKey::Right)
            ),
            1
        );
        assert_eq!(
            revised_correct(
                TargetCategory::Immoral,
                SideMapping::ImmoralLeft,
                Congruency::Incongruent,
                Some(ResponseKey::Left)
            ),
            1
        );
    }

    #[test]
    fn attractive_follows_congruency() {
        assert_eq!(
            revised_correct(
                TargetCategory::Attractive,
                SideMapping::MoralLeft,
                Congruency::Congruent,
                Some(ResponseKey::Left)
            ),
            1
        );
        assert_eq!(
            revised_correct(
                TargetCategory::Attractive,
                SideMapping::MoralLeft,
                Congruency::Incongruent,
                Some(ResponseKey::Right)
            ),
            1
        );
        assert_eq!(
            revised_correct(
                TargetCategory::Attractive,
                SideMapping::ImmoralLeft,
                Congruency::Congruent,
                Some(ResponseKey::Right)
            ),
            1
        );
        assert_eq!(
            revised_correct(
                TargetCategory::Attractive,
                SideMapping::ImmoralLeft,
                Congruency::Incongruent,
                Some(ResponseKey::Left)
            ),
            1
        );
    }

    #[test]
    fn classification_is_total_and_deterministic() {
        // Every combination maps to exactly one flag, and exactly one key is
        // correct for every non-distractor cell (spacebar only for distractors).
        let targets = [
            TargetCategory::Moral,
            TargetCategory::Immoral,
            TargetCategory::Attractive,
            TargetCategory::Distractor,
        ];
        let sides = [SideMapping::MoralLeft, SideMapping::ImmoralLeft];
        let congruencies = [Congruency::Congruent, Congruency::Incongruent];
        let keys = [ResponseKey::Left, ResponseKey::Right, ResponseKey::Space];

        for target in targets {
            for side in sides {
                for congruency in congruencies {
                    let correct_keys: Vec<ResponseKey> = keys
                        .into_iter()
                        .filter(|&k| revised_correct(target, side, congruency, Some(k)) == 1)
                        .collect();
                    assert_eq!(
                        correct_keys.len(),
                        1,
                        "exactly one correct key for {:?}/{:?}/{:?}",
                        target,
                        side,
                        congruency
                    );
                    if target == TargetCategory::Distractor {
                        assert_eq!(correct_keys[0], ResponseKey::Space);
                    } else {
                        assert_ne!(correct_keys[0], ResponseKey::Space);
                    }
                    // Repeat calls agree
                    for key in keys {
                        let a = revised_correct(target, side, congruency, Some(key));
                        let b = revised_correct(target, side, congruency, Some(key));
                        assert_eq!(a, b);
                    }
                }
            }
        }
    }

    #[test]
    fn unknown_response_code_is_incorrect() {
        assert_eq!(
            revised_correct(
                TargetCategory::Moral,
                SideMapping::MoralLeft,
                Congruency::Congruent,
                None
            ),
            0
        );
    }
}
