use super::bands::resolve;
use super::error::CalcError;
use super::types::{
    AcademicLevel, ComputedScore, GradingBand, LevelScoreSettings, SubjectScoreRecord,
};
use crate::store::{GradingConfig, ScoreStore};
use tracing::debug;

/// Whole-number rounding, half up: `Int(x + 0.5)`.
pub fn round_whole(x: f64) -> i64 {
    (x + 0.5).floor() as i64
}

fn check_raw(field: &'static str, value: Option<f64>) -> Result<f64, CalcError> {
    let v = value.unwrap_or(0.0);
    if !v.is_finite() || v < 0.0 {
        return Err(CalcError::InvalidScore { field, value: v });
    }
    Ok(v)
}

fn grade_for(total: i64, bands: &[GradingBand]) -> Result<(i64, String), CalcError> {
    let band = resolve(total as f64, bands).ok_or(CalcError::NoGradingBand(total as f64))?;
    Ok((band.grade, band.remark.clone()))
}

/// Computes the derived fields for one subject entry.
///
/// Without components only the exam score counts. In weighted mode each
/// component is scaled by its weight and rounded on its own; the total is
/// the sum of the rounded components and is what the grade is looked up by.
pub fn compute_subject_score(
    settings: &LevelScoreSettings,
    bands: &[GradingBand],
    class_score: Option<f64>,
    exam_score: Option<f64>,
) -> Result<ComputedScore, CalcError> {
    if !settings.has_components {
        let exam = check_raw("examScore", exam_score)?;
        let total = round_whole(exam);
        let (grade, remark) = grade_for(total, bands)?;
        return Ok(ComputedScore {
            weighted_class_score: None,
            weighted_exam_score: None,
            total_score: total,
            grade,
            remark,
        });
    }

    settings.check_maxima()?;
    let class = check_raw("classScore", class_score)?;
    let exam = check_raw("examScore", exam_score)?;
    if class > settings.max_class_score {
        return Err(CalcError::InvalidScore {
            field: "classScore",
            value: class,
        });
    }
    if exam > settings.max_exam_score {
        return Err(CalcError::InvalidScore {
            field: "examScore",
            value: exam,
        });
    }

    // Multiply before dividing so exact halves stay exact.
    let wc = round_whole(class * settings.class_weight / settings.max_class_score);
    let we = round_whole(exam * settings.exam_weight / settings.max_exam_score);
    let total = wc + we;
    let (grade, remark) = grade_for(total, bands)?;

    Ok(ComputedScore {
        weighted_class_score: Some(wc),
        weighted_exam_score: Some(we),
        total_score: total,
        grade,
        remark,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawSubjectScore {
    pub subject_id: String,
    pub class_score: Option<f64>,
    pub exam_score: Option<f64>,
}

/// Identity of the student whose scores are being entered.
#[derive(Debug, Clone, Copy)]
pub struct ScoreEntryContext<'a> {
    pub student_id: &'a str,
    pub class_id: &'a str,
    pub academic_level: AcademicLevel,
}

/// Computes every entry for one student. The first failure aborts the whole
/// list so a bad row never lands beside good ones.
pub fn compute_subject_scores<C: GradingConfig + ?Sized>(
    config: &C,
    ctx: ScoreEntryContext<'_>,
    entries: &[RawSubjectScore],
) -> Result<Vec<SubjectScoreRecord>, CalcError> {
    let settings = config
        .score_setting_for_level(ctx.academic_level)?
        .ok_or_else(|| CalcError::NoScoreSettings(ctx.academic_level.to_string()))?;
    let bands = config.grading_bands()?;

    entries
        .iter()
        .map(|e| {
            let computed = compute_subject_score(&settings, &bands, e.class_score, e.exam_score)?;
            Ok(SubjectScoreRecord {
                student_id: ctx.student_id.to_string(),
                class_id: ctx.class_id.to_string(),
                subject_id: e.subject_id.clone(),
                academic_level: ctx.academic_level,
                class_score: e.class_score,
                exam_score: e.exam_score,
                computed,
            })
        })
        .collect()
}

/// Computes and upserts one or many subject entries for a student.
pub fn save_subject_scores<S>(
    store: &S,
    ctx: ScoreEntryContext<'_>,
    entries: &[RawSubjectScore],
) -> Result<Vec<SubjectScoreRecord>, CalcError>
where
    S: GradingConfig + ScoreStore + ?Sized,
{
    let records = compute_subject_scores(store, ctx, entries)?;
    store.upsert_subject_scores(&records)?;
    debug!(
        student_id = ctx.student_id,
        class_id = ctx.class_id,
        count = records.len(),
        "saved subject scores"
    );
    Ok(records)
}
