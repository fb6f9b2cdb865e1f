mod test_support;

use rusqlite::Connection;
use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, str_field, temp_dir};

#[test]
fn settings_and_band_edits_are_validated() {
    let workspace = temp_dir("resultsd-settings-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "scoreSettings.upsert",
        json!({
            "academicLevel": "JHS",
            "hasComponents": true,
            "classWeight": 40,
            "examWeight": 50,
            "maxClassScore": 40,
            "maxExamScore": 100
        }),
    );
    assert_eq!(e["code"], "invalid_settings");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "scoreSettings.upsert",
        json!({
            "academicLevel": "JHS",
            "hasComponents": true,
            "classWeight": 30,
            "examWeight": 70,
            "maxClassScore": 0,
            "maxExamScore": 100
        }),
    );
    assert_eq!(e["code"], "zero_max_score");
    assert_eq!(e["details"]["field"], "maxClassScore");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "scoreSettings.upsert",
        json!({ "academicLevel": "Senior High", "hasComponents": false }),
    );
    assert_eq!(e["code"], "invalid_level");

    let listed = request_ok(&mut stdin, &mut reader, "5", "scoreSettings.list", json!({}));
    assert_eq!(listed["settings"].as_array().map(|a| a.len()), Some(0));

    let band = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "gradingBands.upsert",
        json!({ "minScore": 50, "maxScore": 100, "grade": 1, "remark": "Pass" }),
    );
    let band_id = str_field(&band, "id");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "gradingBands.upsert",
        json!({ "minScore": 40, "maxScore": 50, "grade": 2, "remark": "Overlap" }),
    );
    assert_eq!(e["code"], "bad_params");

    // Editing a band in place does not collide with itself.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "gradingBands.upsert",
        json!({ "id": band_id, "minScore": 45, "maxScore": 100, "grade": 1, "remark": "Pass" }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "gradingBands.upsert",
        json!({ "minScore": 10, "maxScore": 20, "grade": 1.5, "remark": "Half" }),
    );
    assert_eq!(e["code"], "bad_params");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "finalBands.upsert",
        json!({ "level": "kg", "minValue": 0, "maxValue": 10, "finalGrade": "A" }),
    );
    assert_eq!(e["code"], "bad_params");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "subjects.upsert",
        json!({ "name": "Drama", "subjectType": "optional" }),
    );
    assert_eq!(e["code"], "bad_params");
}

#[test]
fn score_entry_rejects_bad_input_without_writing() {
    let workspace = temp_dir("resultsd-score-validation");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "scoreSettings.upsert",
        json!({
            "academicLevel": "JHS",
            "hasComponents": true,
            "classWeight": 30,
            "examWeight": 70,
            "maxClassScore": 40,
            "maxExamScore": 100
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "gradingBands.upsert",
        json!({ "minScore": 50, "maxScore": 100, "grade": 1, "remark": "Pass" }),
    );
    let class = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "classes.upsert",
        json!({ "name": "JHS 1", "academicLevel": "JHS" }),
    );
    let class_id = str_field(&class, "id");
    let other_class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "classes.upsert",
        json!({ "name": "JHS 3", "academicLevel": "JHS" }),
    );
    let other_class_id = str_field(&other_class, "id");
    let subject = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "subjects.upsert",
        json!({ "name": "Science" }),
    );
    let subject_id = str_field(&subject, "id");
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.upsert",
        json!({ "classId": class_id, "fullName": "Akosua" }),
    );
    let student_id = str_field(&student, "id");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "8",
        "scores.save",
        json!({ "studentId": student_id, "classId": class_id, "subjectId": subject_id, "classScore": 41, "examScore": 60 }),
    );
    assert_eq!(e["code"], "invalid_score");
    assert_eq!(e["details"]["field"], "classScore");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "9",
        "scores.save",
        json!({ "studentId": student_id, "classId": class_id, "subjectId": subject_id, "classScore": 10, "examScore": -1 }),
    );
    assert_eq!(e["code"], "invalid_score");
    assert_eq!(e["details"]["field"], "examScore");

    // 8 + 21 = 29, below every band.
    let e = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "scores.save",
        json!({ "studentId": student_id, "classId": class_id, "subjectId": subject_id, "classScore": 10, "examScore": 30 }),
    );
    assert_eq!(e["code"], "no_grading_band");
    assert_eq!(e["details"]["value"], 29.0);

    let e = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "scores.save",
        json!({ "studentId": student_id, "classId": other_class_id, "subjectId": subject_id, "examScore": 60 }),
    );
    assert_eq!(e["code"], "not_found");

    // One bad entry sinks the whole bulk save.
    let e = request_err(
        &mut stdin,
        &mut reader,
        "12",
        "scores.saveBulk",
        json!({
            "studentId": student_id,
            "classId": class_id,
            "entries": [
                { "subjectId": subject_id, "classScore": 30, "examScore": 80 },
                { "subjectId": subject_id, "classScore": 30, "examScore": 180 }
            ]
        }),
    );
    assert_eq!(e["code"], "invalid_score");

    let scores = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "scores.list",
        json!({ "classId": class_id }),
    );
    assert_eq!(scores["scores"].as_array().map(|a| a.len()), Some(0));

    // A zero maximum that slipped into the database is still caught at entry.
    let conn = Connection::open(workspace.join("results.sqlite3")).expect("open db");
    conn.execute(
        "UPDATE score_settings SET max_exam_score = 0 WHERE academic_level = 'JHS'",
        [],
    )
    .expect("break settings");
    let e = request_err(
        &mut stdin,
        &mut reader,
        "14",
        "scores.save",
        json!({ "studentId": student_id, "classId": class_id, "subjectId": subject_id, "classScore": 30, "examScore": 80 }),
    );
    assert_eq!(e["code"], "zero_max_score");
    assert_eq!(e["details"]["field"], "maxExamScore");
}
