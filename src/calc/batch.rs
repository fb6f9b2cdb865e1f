use super::error::CalcError;
use super::final_result::{generate_final_result, FinalOutcome, SkipReason};
use super::types::{normalize_result_level, FinalResult};
use crate::store::{GradingConfig, ResultStore, ScoreStore, StoreError};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StudentSkip {
    NoScores,
    StoreUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedStudent {
    pub student_id: String,
    pub reason: StudentSkip,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassResults {
    /// True when the class's level gets no final results at all.
    pub excluded_level: bool,
    /// Generated results in roster order.
    pub results: Vec<FinalResult>,
    pub skipped: Vec<SkippedStudent>,
}

/// Runs final-result generation for each student in order.
///
/// A student without scores, or whose scores cannot be read because the
/// store is unreachable, is skipped; the rest of the class still gets
/// results. An unknown level name fails the call before any read.
pub fn generate_for_class<S>(
    store: &S,
    class_id: &str,
    term: i64,
    level: &str,
    student_ids: &[String],
) -> Result<ClassResults, CalcError>
where
    S: GradingConfig + ScoreStore + ?Sized,
{
    if normalize_result_level(level)?.is_none() {
        info!(class_id, level, "level excluded from final results");
        return Ok(ClassResults {
            excluded_level: true,
            ..ClassResults::default()
        });
    }

    let mut out = ClassResults::default();
    for student_id in student_ids {
        match generate_final_result(store, student_id, class_id, term, level) {
            Ok(FinalOutcome::Generated(r)) => out.results.push(r),
            Ok(FinalOutcome::Skipped(SkipReason::NoScores)) => out.skipped.push(SkippedStudent {
                student_id: student_id.clone(),
                reason: StudentSkip::NoScores,
                detail: None,
            }),
            Ok(FinalOutcome::Skipped(SkipReason::ExcludedLevel)) => {}
            Err(CalcError::Store(StoreError::Unavailable(msg))) => {
                warn!(student_id = %student_id, class_id, error = %msg, "skipping student: store unavailable");
                out.skipped.push(SkippedStudent {
                    student_id: student_id.clone(),
                    reason: StudentSkip::StoreUnavailable,
                    detail: Some(msg),
                });
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        class_id,
        term,
        generated = out.results.len(),
        skipped = out.skipped.len(),
        "generated class results"
    );
    Ok(out)
}

/// [`generate_for_class`] followed by a single upsert of every produced result.
pub fn generate_and_save_for_class<S>(
    store: &S,
    class_id: &str,
    term: i64,
    level: &str,
    student_ids: &[String],
) -> Result<ClassResults, CalcError>
where
    S: GradingConfig + ScoreStore + ResultStore + ?Sized,
{
    let out = generate_for_class(store, class_id, term, level, student_ids)?;
    if !out.results.is_empty() {
        store.upsert_final_results(&out.results)?;
    }
    Ok(out)
}
