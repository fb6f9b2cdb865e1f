use super::roster::{class_level, ensure_student_in_class};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{optional_i64, optional_str, required_str, required_term, with_conn};
use crate::ipc::types::{AppState, Request};
use crate::store::sqlite::now_stamp;
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
enum OptionKind {
    Conduct,
    Interest,
}

impl OptionKind {
    fn parse(params: &Value) -> Result<Self, HandlerErr> {
        match required_str(params, "kind")?.to_ascii_lowercase().as_str() {
            "conduct" => Ok(Self::Conduct),
            "interest" => Ok(Self::Interest),
            other => Err(HandlerErr::bad_params("kind must be one of: conduct, interest")
                .with_details(json!({ "kind": other }))),
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::Conduct => "conduct_settings",
            Self::Interest => "interest_settings",
        }
    }

    fn name_column(self) -> &'static str {
        match self {
            Self::Conduct => "conduct_name",
            Self::Interest => "interest_name",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Conduct => "conduct",
            Self::Interest => "interest",
        }
    }
}

fn option_exists(conn: &Connection, kind: OptionKind, id: &str) -> Result<bool, HandlerErr> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", kind.table());
    let found: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(found.is_some())
}

fn options_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let kind = OptionKind::parse(params)?;
    let sql = format!(
        "SELECT id, {col} FROM {table} ORDER BY {col}",
        col = kind.name_column(),
        table = kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let options = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "kind": kind.as_str(), "options": options }))
}

fn options_add(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let kind = OptionKind::parse(params)?;
    let name = required_str(params, "name")?;
    ensure_unique_name(conn, kind, &name, None)?;

    let id = Uuid::new_v4().to_string();
    let sql = format!(
        "INSERT INTO {}(id, {}) VALUES(?, ?)",
        kind.table(),
        kind.name_column()
    );
    conn.execute(&sql, (&id, &name))?;
    Ok(json!({ "id": id, "name": name }))
}

fn ensure_unique_name(
    conn: &Connection,
    kind: OptionKind,
    name: &str,
    except_id: Option<&str>,
) -> Result<(), HandlerErr> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ? COLLATE NOCASE AND id IS NOT ?",
        kind.table(),
        kind.name_column()
    );
    let existing: Option<String> = conn
        .query_row(&sql, (name, except_id), |r| r.get(0))
        .optional()?;
    if existing.is_some() {
        return Err(HandlerErr::bad_params(format!("{} option already exists", kind.as_str()))
            .with_details(json!({ "name": name })));
    }
    Ok(())
}

fn options_update(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let kind = OptionKind::parse(params)?;
    let id = required_str(params, "id")?;
    let name = required_str(params, "name")?;
    if !option_exists(conn, kind, &id)? {
        return Err(HandlerErr::not_found(
            format!("{} option not found", kind.as_str()),
            json!({ "id": id }),
        ));
    }
    ensure_unique_name(conn, kind, &name, Some(&id))?;

    let sql = format!(
        "UPDATE {} SET {} = ? WHERE id = ?",
        kind.table(),
        kind.name_column()
    );
    conn.execute(&sql, (&name, &id))?;
    Ok(json!({ "id": id, "name": name }))
}

fn options_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let kind = OptionKind::parse(params)?;
    let id = required_str(params, "id")?;
    let column = match kind {
        OptionKind::Conduct => "conduct_id",
        OptionKind::Interest => "interest_id",
    };
    let tx = conn.unchecked_transaction()?;
    // Entries pointing at the option lose the reference, not the row.
    tx.execute(
        &format!("UPDATE student_conduct_interest SET {column} = NULL WHERE {column} = ?"),
        [&id],
    )?;
    let n = tx.execute(&format!("DELETE FROM {} WHERE id = ?", kind.table()), [&id])?;
    tx.commit()?;
    Ok(json!({ "deleted": n > 0 }))
}

fn conduct_get(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let term = required_term(params)?;
    let student_id = optional_str(params, "studentId")?;

    let mut stmt = conn.prepare(
        "SELECT st.id, st.full_name, e.conduct_id, c.conduct_name,
                e.interest_id, i.interest_name, e.attendance, e.updated_at
         FROM students st
         LEFT JOIN student_conduct_interest e
           ON e.student_id = st.id AND e.class_id = st.class_id AND e.term = ?2
         LEFT JOIN conduct_settings c ON c.id = e.conduct_id
         LEFT JOIN interest_settings i ON i.id = e.interest_id
         WHERE st.class_id = ?1 AND (?3 IS NULL OR st.id = ?3)
         ORDER BY st.sort_order, st.id",
    )?;
    let entries = stmt
        .query_map((&class_id, term, &student_id), |r| {
            Ok(json!({
                "studentId": r.get::<_, String>(0)?,
                "fullName": r.get::<_, String>(1)?,
                "conductId": r.get::<_, Option<String>>(2)?,
                "conduct": r.get::<_, Option<String>>(3)?,
                "interestId": r.get::<_, Option<String>>(4)?,
                "interest": r.get::<_, Option<String>>(5)?,
                "attendance": r.get::<_, Option<i64>>(6)?,
                "updatedAt": r.get::<_, Option<String>>(7)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "classId": class_id, "term": term, "entries": entries }))
}

fn conduct_save(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let class_id = required_str(params, "classId")?;
    let term = required_term(params)?;
    let conduct_id = optional_str(params, "conductId")?;
    let interest_id = optional_str(params, "interestId")?;
    let attendance = optional_i64(params, "attendance")?;

    class_level(conn, &class_id)?;
    ensure_student_in_class(conn, &student_id, &class_id)?;
    if let Some(a) = attendance {
        if a < 0 {
            return Err(HandlerErr::bad_params("attendance must be >= 0")
                .with_details(json!({ "attendance": a })));
        }
    }
    for (kind, id) in [
        (OptionKind::Conduct, &conduct_id),
        (OptionKind::Interest, &interest_id),
    ] {
        if let Some(id) = id {
            if !option_exists(conn, kind, id)? {
                return Err(HandlerErr::not_found(
                    format!("{} option not found", kind.as_str()),
                    json!({ "id": id }),
                ));
            }
        }
    }

    conn.execute(
        "INSERT INTO student_conduct_interest(
            student_id, class_id, term, conduct_id, interest_id, attendance, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, class_id, term) DO UPDATE SET
           conduct_id = excluded.conduct_id,
           interest_id = excluded.interest_id,
           attendance = excluded.attendance,
           updated_at = excluded.updated_at",
        (
            &student_id,
            &class_id,
            term,
            &conduct_id,
            &interest_id,
            attendance,
            now_stamp(),
        ),
    )?;
    Ok(json!({ "ok": true }))
}

fn conduct_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let class_id = required_str(params, "classId")?;
    let term = required_term(params)?;
    let n = conn.execute(
        "DELETE FROM student_conduct_interest WHERE student_id = ? AND class_id = ? AND term = ?",
        (&student_id, &class_id, term),
    )?;
    Ok(json!({ "deleted": n > 0 }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: fn(&Connection, &Value) -> Result<Value, HandlerErr> = match req.method.as_str() {
        "conduct.options.list" => options_list,
        "conduct.options.add" => options_add,
        "conduct.options.update" => options_update,
        "conduct.options.delete" => options_delete,
        "conduct.get" => conduct_get,
        "conduct.save" => conduct_save,
        "conduct.delete" => conduct_delete,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}
