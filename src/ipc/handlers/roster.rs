use crate::calc::{AcademicLevel, SubjectType};
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{optional_str, required_str, string_list, with_conn};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::{json, Value};
use uuid::Uuid;

/// Academic level of a class, as stored.
pub fn class_level(conn: &Connection, class_id: &str) -> Result<AcademicLevel, HandlerErr> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT academic_level FROM classes WHERE id = ?",
            [class_id],
            |r| r.get(0),
        )
        .optional()?;
    let Some(raw) = raw else {
        return Err(HandlerErr::not_found(
            "class not found",
            json!({ "classId": class_id }),
        ));
    };
    Ok(AcademicLevel::parse(&raw)?)
}

/// Student ids of a class in roster order.
pub fn class_roster(conn: &Connection, class_id: &str) -> Result<Vec<String>, HandlerErr> {
    let mut stmt =
        conn.prepare("SELECT id FROM students WHERE class_id = ? ORDER BY sort_order, id")?;
    let ids = stmt
        .query_map([class_id], |r| r.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

pub fn ensure_student_in_class(
    conn: &Connection,
    student_id: &str,
    class_id: &str,
) -> Result<(), HandlerErr> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM students WHERE id = ? AND class_id = ?",
            (student_id, class_id),
            |r| r.get(0),
        )
        .optional()?;
    if found.is_none() {
        return Err(HandlerErr::not_found(
            "student not found in class",
            json!({ "studentId": student_id, "classId": class_id }),
        ));
    }
    Ok(())
}

fn classes_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.academic_level,
                (SELECT COUNT(*) FROM students s WHERE s.class_id = c.id)
         FROM classes c
         ORDER BY c.academic_level, c.name",
    )?;
    let classes = stmt
        .query_map([], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "academicLevel": r.get::<_, String>(2)?,
                "studentCount": r.get::<_, i64>(3)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "classes": classes }))
}

fn classes_upsert(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = optional_str(params, "id")?.unwrap_or_else(|| Uuid::new_v4().to_string());
    let name = required_str(params, "name")?;
    let level = AcademicLevel::parse(&required_str(params, "academicLevel")?)?;
    conn.execute(
        "INSERT INTO classes(id, name, academic_level) VALUES(?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           academic_level = excluded.academic_level",
        (&id, &name, level.label()),
    )?;
    Ok(json!({ "id": id, "academicLevel": level }))
}

fn classes_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM class_subjects WHERE class_id = ?", [&id])?;
    let n = tx.execute("DELETE FROM classes WHERE id = ?", [&id])?;
    tx.commit()?;
    Ok(json!({ "deleted": n > 0 }))
}

fn subjects_list(conn: &Connection, _params: &Value) -> Result<Value, HandlerErr> {
    let mut stmt = conn.prepare("SELECT id, name, subject_type FROM subjects ORDER BY name")?;
    let subjects = stmt
        .query_map([], |r| {
            let subject_type: Option<String> = r.get(2)?;
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "subjectType": SubjectType::normalize(subject_type.as_deref()),
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "subjects": subjects }))
}

fn subjects_upsert(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = optional_str(params, "id")?.unwrap_or_else(|| Uuid::new_v4().to_string());
    let name = required_str(params, "name")?;
    let subject_type = match optional_str(params, "subjectType")? {
        None => SubjectType::Core,
        Some(raw) => SubjectType::parse_strict(&raw).ok_or_else(|| {
            HandlerErr::bad_params("subjectType must be one of: core, elective, other")
                .with_details(json!({ "subjectType": raw }))
        })?,
    };
    conn.execute(
        "INSERT INTO subjects(id, name, subject_type) VALUES(?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
           name = excluded.name,
           subject_type = excluded.subject_type",
        (&id, &name, subject_type.as_str()),
    )?;
    Ok(json!({ "id": id, "subjectType": subject_type }))
}

fn subjects_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM class_subjects WHERE subject_id = ?", [&id])?;
    let n = tx.execute("DELETE FROM subjects WHERE id = ?", [&id])?;
    tx.commit()?;
    Ok(json!({ "deleted": n > 0 }))
}

fn students_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let mut stmt = conn.prepare(
        "SELECT id, full_name, sort_order FROM students WHERE class_id = ? ORDER BY sort_order, id",
    )?;
    let students = stmt
        .query_map([&class_id], |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "fullName": r.get::<_, String>(1)?,
                "sortOrder": r.get::<_, i64>(2)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "classId": class_id, "students": students }))
}

fn students_upsert(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let full_name = required_str(params, "fullName")?;
    class_level(conn, &class_id)?;

    if let Some(id) = optional_str(params, "id")? {
        let current: Option<String> = conn
            .query_row("SELECT class_id FROM students WHERE id = ?", [&id], |r| {
                r.get(0)
            })
            .optional()?;
        match current {
            Some(current) if current == class_id => {
                conn.execute(
                    "UPDATE students SET full_name = ? WHERE id = ?",
                    (&full_name, &id),
                )?;
            }
            // Moving classes puts the student at the end of the new roster.
            Some(_) => {
                let next = next_sort_order(conn, &class_id)?;
                conn.execute(
                    "UPDATE students SET class_id = ?, full_name = ?, sort_order = ? WHERE id = ?",
                    (&class_id, &full_name, next, &id),
                )?;
            }
            None => append_student(conn, &id, &class_id, &full_name)?,
        }
        return Ok(json!({ "id": id }));
    }

    let id = Uuid::new_v4().to_string();
    append_student(conn, &id, &class_id, &full_name)?;
    Ok(json!({ "id": id }))
}

fn next_sort_order(conn: &Connection, class_id: &str) -> Result<i64, HandlerErr> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM students WHERE class_id = ?",
        [class_id],
        |r| r.get(0),
    )?;
    Ok(next)
}

fn append_student(
    conn: &Connection,
    id: &str,
    class_id: &str,
    full_name: &str,
) -> Result<(), HandlerErr> {
    let next = next_sort_order(conn, class_id)?;
    conn.execute(
        "INSERT INTO students(id, class_id, full_name, sort_order) VALUES(?, ?, ?, ?)",
        (id, class_id, full_name, next),
    )?;
    Ok(())
}

fn students_delete(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let id = required_str(params, "id")?;
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM student_scores WHERE student_id = ?", [&id])?;
    tx.execute("DELETE FROM student_final_results WHERE student_id = ?", [&id])?;
    tx.execute("DELETE FROM student_conduct_interest WHERE student_id = ?", [&id])?;
    let n = tx.execute("DELETE FROM students WHERE id = ?", [&id])?;
    tx.commit()?;
    Ok(json!({ "deleted": n > 0 }))
}

fn class_subjects_list(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let mut stmt = conn.prepare(
        "SELECT cs.id, s.id, s.name, s.subject_type
         FROM class_subjects cs
         JOIN subjects s ON s.id = cs.subject_id
         WHERE cs.class_id = ?
         ORDER BY s.name",
    )?;
    let rows = stmt
        .query_map([&class_id], |r| {
            let subject_type: Option<String> = r.get(3)?;
            Ok(json!({
                "assignmentId": r.get::<_, String>(0)?,
                "subjectId": r.get::<_, String>(1)?,
                "subjectName": r.get::<_, String>(2)?,
                "subjectType": SubjectType::normalize(subject_type.as_deref()),
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "classId": class_id, "subjects": rows }))
}

fn class_subjects_assign(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let subject_ids = string_list(params, "subjectIds")?
        .ok_or_else(|| HandlerErr::bad_params("missing subjectIds"))?;
    class_level(conn, &class_id)?;

    let tx = conn.unchecked_transaction()?;
    let mut added = 0usize;
    for subject_id in &subject_ids {
        // Duplicate assignments are ignored.
        added += tx.execute(
            "INSERT INTO class_subjects(id, class_id, subject_id) VALUES(?, ?, ?)
             ON CONFLICT(class_id, subject_id) DO NOTHING",
            (Uuid::new_v4().to_string(), &class_id, subject_id),
        )?;
    }
    tx.commit()?;
    Ok(json!({ "added": added }))
}

fn class_subjects_remove(conn: &Connection, params: &Value) -> Result<Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let subject_id = required_str(params, "subjectId")?;
    let n = conn.execute(
        "DELETE FROM class_subjects WHERE class_id = ? AND subject_id = ?",
        (&class_id, &subject_id),
    )?;
    Ok(json!({ "removed": n > 0 }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: fn(&Connection, &Value) -> Result<Value, HandlerErr> = match req.method.as_str() {
        "classes.list" => classes_list,
        "classes.upsert" => classes_upsert,
        "classes.delete" => classes_delete,
        "subjects.list" => subjects_list,
        "subjects.upsert" => subjects_upsert,
        "subjects.delete" => subjects_delete,
        "students.list" => students_list,
        "students.upsert" => students_upsert,
        "students.delete" => students_delete,
        "classSubjects.list" => class_subjects_list,
        "classSubjects.assign" => class_subjects_assign,
        "classSubjects.remove" => class_subjects_remove,
        _ => return None,
    };
    Some(with_conn(state, req, f))
}
