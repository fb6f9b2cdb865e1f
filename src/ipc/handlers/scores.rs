use super::roster::{class_level, ensure_student_in_class};
use crate::calc::{
    compute_subject_score, save_subject_scores, AcademicLevel, CalcError, RawSubjectScore,
    ScoreEntryContext,
};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{optional_f64, optional_str, required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::store::sqlite::SqliteStore;
use crate::store::GradingConfig;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::{json, Value};

fn raw_entry(v: &Value) -> Result<RawSubjectScore, HandlerErr> {
    Ok(RawSubjectScore {
        subject_id: required_str(v, "subjectId")?,
        class_score: optional_f64(v, "classScore")?,
        exam_score: optional_f64(v, "examScore")?,
    })
}

fn scores_preview(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let level = AcademicLevel::parse(&required_str(params, "academicLevel")?)?;
    let store = SqliteStore::new(conn);
    let settings = store
        .score_setting_for_level(level)?
        .ok_or_else(|| CalcError::NoScoreSettings(level.to_string()))?;
    let bands = store.grading_bands()?;
    let computed = compute_subject_score(
        &settings,
        &bands,
        optional_f64(params, "classScore")?,
        optional_f64(params, "examScore")?,
    )?;
    Ok(json!({ "academicLevel": level, "score": computed }))
}

fn save_for_student(
    conn: &Connection,
    student_id: &str,
    class_id: &str,
    entries: &[RawSubjectScore],
) -> Result<Value, HandlerErr> {
    let academic_level = class_level(conn, class_id)?;
    ensure_student_in_class(conn, student_id, class_id)?;
    let ctx = ScoreEntryContext {
        student_id,
        class_id,
        academic_level,
    };
    let records = save_subject_scores(&SqliteStore::new(conn), ctx, entries)?;
    Ok(json!({ "saved": records.len(), "scores": records }))
}

fn scores_save(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let class_id = required_str(params, "classId")?;
    let entry = raw_entry(params)?;
    save_for_student(conn, &student_id, &class_id, &[entry])
}

fn scores_save_bulk(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let class_id = required_str(params, "classId")?;
    let Some(items) = params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::bad_params("entries must be an array"));
    };
    let entries = items
        .iter()
        .enumerate()
        .map(|(i, v)| raw_entry(v).map_err(|e| e.with_details(json!({ "index": i }))))
        .collect::<Result<Vec<_>, _>>()?;
    save_for_student(conn, &student_id, &class_id, &entries)
}

fn scores_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let student_id = optional_str(params, "studentId")?;

    let mut sql = String::from(
        "SELECT ss.student_id, ss.subject_id, COALESCE(sub.name, ss.subject_id),
                ss.class_score, ss.exam_score, ss.weighted_class_score, ss.weighted_exam_score,
                ss.total_score, ss.grade, ss.remark, ss.updated_at
         FROM student_scores ss
         LEFT JOIN subjects sub ON sub.id = ss.subject_id
         LEFT JOIN students st ON st.id = ss.student_id
         WHERE ss.class_id = ?",
    );
    let mut binds = vec![SqlValue::Text(class_id.clone())];
    if let Some(s) = &student_id {
        sql.push_str(" AND ss.student_id = ?");
        binds.push(SqlValue::Text(s.clone()));
    }
    sql.push_str(" ORDER BY st.sort_order, ss.student_id, sub.name");

    let mut stmt = conn.prepare(&sql)?;
    let scores = stmt
        .query_map(params_from_iter(binds), |r| {
            Ok(json!({
                "studentId": r.get::<_, String>(0)?,
                "subjectId": r.get::<_, String>(1)?,
                "subjectName": r.get::<_, String>(2)?,
                "classScore": r.get::<_, Option<f64>>(3)?,
                "examScore": r.get::<_, Option<f64>>(4)?,
                "weightedClassScore": r.get::<_, Option<i64>>(5)?,
                "weightedExamScore": r.get::<_, Option<i64>>(6)?,
                "totalScore": r.get::<_, i64>(7)?,
                "grade": r.get::<_, i64>(8)?,
                "remark": r.get::<_, String>(9)?,
                "updatedAt": r.get::<_, Option<String>>(10)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "classId": class_id, "scores": scores }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: fn(&Connection, &Value) -> Result<Value, HandlerErr> = match req.method.as_str() {
        "scores.preview" => scores_preview,
        "scores.save" => scores_save,
        "scores.saveBulk" => scores_save_bulk,
        "scores.list" => scores_list,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}
