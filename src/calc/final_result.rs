use super::bands::resolve;
use super::error::CalcError;
use super::types::{
    normalize_result_level, FinalGradingBand, FinalResult, ResultLevel, SubjectScoreRow,
    SubjectType,
};
use crate::store::{GradingConfig, ScoreStore};
use serde::Serialize;

pub const UNGRADED: &str = "N/A";

/// How many of the best elective grades count toward the JHS aggregate.
pub const COUNTED_ELECTIVES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    ExcludedLevel,
    NoScores,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalOutcome {
    Generated(FinalResult),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateParts {
    pub core_sum: i64,
    pub elective_sum: i64,
}

impl AggregateParts {
    pub fn aggregate(self) -> i64 {
        self.core_sum + self.elective_sum
    }
}

/// Core grades always count; only the lowest two elective grades do
/// (lower is better). Ties keep subject order.
pub fn aggregate_parts(scores: &[SubjectScoreRow]) -> AggregateParts {
    let core_sum = scores
        .iter()
        .filter(|s| s.subject_type == SubjectType::Core)
        .map(|s| s.grade)
        .sum();
    let mut electives: Vec<i64> = scores
        .iter()
        .filter(|s| s.subject_type == SubjectType::Elective)
        .map(|s| s.grade)
        .collect();
    electives.sort();
    let elective_sum = electives.iter().take(COUNTED_ELECTIVES).sum();
    AggregateParts {
        core_sum,
        elective_sum,
    }
}

/// Builds the final result for one student from already-fetched rows.
///
/// Returns `None` when there are no subject rows.
pub fn assemble_final_result(
    student_id: &str,
    class_id: &str,
    term: i64,
    level: ResultLevel,
    scores: &[SubjectScoreRow],
    bands: &[FinalGradingBand],
) -> Option<FinalResult> {
    if scores.is_empty() {
        return None;
    }

    let grand_total: i64 = scores.iter().map(|s| s.total_score).sum();
    let aggregate = match level {
        ResultLevel::Jhs => Some(aggregate_parts(scores).aggregate()),
        ResultLevel::Primary => None,
    };
    let compare_value = aggregate.unwrap_or(grand_total);

    let (final_grade, descriptor, remark) = match resolve(compare_value as f64, bands) {
        Some(b) => (b.final_grade.clone(), b.descriptor.clone(), b.remark.clone()),
        None => (UNGRADED.to_string(), None, None),
    };

    Some(FinalResult {
        student_id: student_id.to_string(),
        class_id: class_id.to_string(),
        term,
        level,
        grand_total,
        aggregate,
        final_grade,
        descriptor,
        remark,
    })
}

/// Reads a student's persisted scores and the tier's final bands, then
/// assembles the final result. Nothing is written.
pub fn generate_final_result<S>(
    store: &S,
    student_id: &str,
    class_id: &str,
    term: i64,
    level: &str,
) -> Result<FinalOutcome, CalcError>
where
    S: GradingConfig + ScoreStore + ?Sized,
{
    let Some(result_level) = normalize_result_level(level)? else {
        return Ok(FinalOutcome::Skipped(SkipReason::ExcludedLevel));
    };
    let scores = store.student_scores(student_id, class_id)?;
    if scores.is_empty() {
        return Ok(FinalOutcome::Skipped(SkipReason::NoScores));
    }
    let bands = store.final_grading_bands(result_level)?;
    Ok(
        match assemble_final_result(student_id, class_id, term, result_level, &scores, &bands) {
            Some(r) => FinalOutcome::Generated(r),
            None => FinalOutcome::Skipped(SkipReason::NoScores),
        },
    )
}
