use crate::calc::bands::check_candidate;
use crate::calc::{AcademicLevel, LevelScoreSettings, ResultLevel};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    optional_f64, optional_str, required_bool, required_f64, required_str, with_conn,
};
use crate::ipc::types::{AppState, Request};
use crate::store::sqlite::SqliteStore;
use crate::store::GradingConfig;
use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

fn parse_level(params: &Value) -> Result<AcademicLevel, HandlerErr> {
    let raw = required_str(params, "academicLevel")?;
    Ok(AcademicLevel::parse(&raw)?)
}

fn parse_result_level(params: &Value) -> Result<ResultLevel, HandlerErr> {
    let raw = required_str(params, "level")?;
    ResultLevel::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params("level must be one of: primary, jhs"))
}

fn score_settings_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let store = SqliteStore::new(conn);
    let mut out = Vec::new();
    for level in AcademicLevel::ALL {
        if let Some(s) = store.score_setting_for_level(level)? {
            out.push(s);
        }
    }
    Ok(json!({ "settings": out }))
}

fn score_settings_upsert(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let academic_level = parse_level(params)?;
    let has_components = required_bool(params, "hasComponents")?;
    let settings = if has_components {
        LevelScoreSettings {
            academic_level,
            has_components,
            class_weight: required_f64(params, "classWeight")?,
            exam_weight: required_f64(params, "examWeight")?,
            max_class_score: required_f64(params, "maxClassScore")?,
            max_exam_score: required_f64(params, "maxExamScore")?,
        }
    } else {
        // Exam-only levels: the whole total comes from the exam score.
        LevelScoreSettings {
            academic_level,
            has_components,
            class_weight: 0.0,
            exam_weight: 100.0,
            max_class_score: optional_f64(params, "maxClassScore")?.unwrap_or(100.0),
            max_exam_score: optional_f64(params, "maxExamScore")?.unwrap_or(100.0),
        }
    };
    settings.validate()?;

    conn.execute(
        "INSERT INTO score_settings(academic_level, has_components, class_weight, exam_weight, max_class_score, max_exam_score)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(academic_level) DO UPDATE SET
           has_components = excluded.has_components,
           class_weight = excluded.class_weight,
           exam_weight = excluded.exam_weight,
           max_class_score = excluded.max_class_score,
           max_exam_score = excluded.max_exam_score",
        (
            academic_level.label(),
            settings.has_components as i64,
            settings.class_weight,
            settings.exam_weight,
            settings.max_class_score,
            settings.max_exam_score,
        ),
    )?;
    info!(level = %academic_level, "score settings saved");
    Ok(json!({ "settings": settings }))
}

fn score_settings_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let level = parse_level(params)?;
    let n = conn.execute(
        "DELETE FROM score_settings WHERE academic_level = ?",
        [level.label()],
    )?;
    Ok(json!({ "deleted": n > 0 }))
}

fn grading_bands_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let bands = SqliteStore::new(conn).grading_bands()?;
    Ok(json!({ "bands": bands }))
}

fn grading_bands_upsert(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = optional_str(params, "id")?;
    let min = required_f64(params, "minScore")?;
    let max = required_f64(params, "maxScore")?;
    let grade = params
        .get("grade")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params("grade must be integer"))?;
    let remark = required_str(params, "remark")?;

    let existing = SqliteStore::new(conn).grading_bands()?;
    check_candidate(min, max, &existing, |b| Some(&b.id) == id.as_ref())
        .map_err(|m| HandlerErr::bad_params(m).with_details(json!({ "minScore": min, "maxScore": max })))?;

    let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO grading_scales(id, min_score, max_score, grade, remark)
         VALUES(?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           min_score = excluded.min_score,
           max_score = excluded.max_score,
           grade = excluded.grade,
           remark = excluded.remark",
        (&id, min, max, grade, &remark),
    )?;
    Ok(json!({ "id": id }))
}

fn grading_bands_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let n = conn.execute("DELETE FROM grading_scales WHERE id = ?", [&id])?;
    Ok(json!({ "deleted": n > 0 }))
}

fn final_bands_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let level = parse_result_level(params)?;
    let bands = SqliteStore::new(conn).final_grading_bands(level)?;
    Ok(json!({ "level": level, "bands": bands }))
}

fn final_bands_upsert(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = optional_str(params, "id")?;
    let level = parse_result_level(params)?;
    let min = required_f64(params, "minValue")?;
    let max = required_f64(params, "maxValue")?;
    let final_grade = required_str(params, "finalGrade")?;
    let descriptor = optional_str(params, "descriptor")?;
    let remark = optional_str(params, "remark")?;

    let existing = SqliteStore::new(conn).final_grading_bands(level)?;
    check_candidate(min, max, &existing, |b| Some(&b.id) == id.as_ref())
        .map_err(|m| HandlerErr::bad_params(m).with_details(json!({ "minValue": min, "maxValue": max })))?;

    let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
    conn.execute(
        "INSERT INTO final_grading_scales(id, level, min_value, max_value, final_grade, descriptor, remark)
         VALUES(?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           level = excluded.level,
           min_value = excluded.min_value,
           max_value = excluded.max_value,
           final_grade = excluded.final_grade,
           descriptor = excluded.descriptor,
           remark = excluded.remark",
        (&id, level.as_str(), min, max, &final_grade, &descriptor, &remark),
    )?;
    Ok(json!({ "id": id }))
}

fn final_bands_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let n = conn.execute("DELETE FROM final_grading_scales WHERE id = ?", [&id])?;
    Ok(json!({ "deleted": n > 0 }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: fn(&Connection, &Value) -> Result<Value, HandlerErr> = match req.method.as_str() {
        "scoreSettings.list" => score_settings_list,
        "scoreSettings.upsert" => score_settings_upsert,
        "scoreSettings.delete" => score_settings_delete,
        "gradingBands.list" => grading_bands_list,
        "gradingBands.upsert" => grading_bands_upsert,
        "gradingBands.delete" => grading_bands_delete,
        "finalBands.list" => final_bands_list,
        "finalBands.upsert" => final_bands_upsert,
        "finalBands.delete" => final_bands_delete,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}
