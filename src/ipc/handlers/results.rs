use super::roster::{class_level, class_roster, ensure_student_in_class};
use crate::calc::{generate_and_save_for_class, generate_final_result, FinalOutcome};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{
    optional_str, optional_term, required_str, required_term, string_list, with_conn,
};
use crate::ipc::types::{AppState, Request};
use crate::store::sqlite::SqliteStore;
use crate::store::{ResultFilter, ResultStore};
use rusqlite::Connection;
use serde_json::{json, Value};
use tracing::info;

fn results_generate(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let class_id = required_str(params, "classId")?;
    let term = required_term(params)?;
    let level = class_level(conn, &class_id)?;
    ensure_student_in_class(conn, &student_id, &class_id)?;

    let store = SqliteStore::new(conn);
    match generate_final_result(&store, &student_id, &class_id, term, level.label())? {
        FinalOutcome::Generated(result) => {
            store.upsert_final_results(std::slice::from_ref(&result))?;
            info!(
                student_id = %student_id,
                class_id = %class_id,
                term,
                grade = %result.final_grade,
                "final result saved"
            );
            Ok(json!({ "generated": true, "result": result }))
        }
        FinalOutcome::Skipped(reason) => Ok(json!({ "generated": false, "reason": reason })),
    }
}

fn results_generate_class(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let term = required_term(params)?;
    let level = class_level(conn, &class_id)?;
    let student_ids = match string_list(params, "studentIds")? {
        Some(ids) => ids,
        None => class_roster(conn, &class_id)?,
    };

    let store = SqliteStore::new(conn);
    let out = generate_and_save_for_class(&store, &class_id, term, level.label(), &student_ids)?;
    Ok(json!({
        "classId": class_id,
        "term": term,
        "academicLevel": level,
        "excludedLevel": out.excluded_level,
        "results": out.results,
        "skipped": out.skipped,
    }))
}

fn results_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let filter = ResultFilter {
        student_id: optional_str(params, "studentId")?,
        class_id: optional_str(params, "classId")?,
        term: optional_term(params)?,
    };
    let results = SqliteStore::new(conn).final_results(&filter)?;
    Ok(json!({ "results": results }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: fn(&Connection, &Value) -> Result<Value, HandlerErr> = match req.method.as_str() {
        "results.generate" => results_generate,
        "results.generateClass" => results_generate_class,
        "results.list" => results_list,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}
