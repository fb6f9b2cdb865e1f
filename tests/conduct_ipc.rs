mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, str_field, temp_dir};

#[test]
fn conduct_entries_upsert_per_student_and_term() {
    let workspace = temp_dir("resultsd-conduct");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let respectful = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "conduct.options.add",
        json!({ "kind": "conduct", "name": "Respectful" }),
    );
    let respectful_id = str_field(&respectful, "id");
    let e = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "conduct.options.add",
        json!({ "kind": "conduct", "name": "respectful" }),
    );
    assert_eq!(e["code"], "bad_params");

    let football = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "conduct.options.add",
        json!({ "kind": "interest", "name": "Football" }),
    );
    let football_id = str_field(&football, "id");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "classes.upsert",
        json!({ "name": "Basic 3", "academicLevel": "Lower Primary" }),
    );
    let class_id = str_field(&class, "id");
    let abena = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.upsert",
        json!({ "classId": class_id, "fullName": "Abena" }),
    );
    let abena_id = str_field(&abena, "id");
    let kojo = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "students.upsert",
        json!({ "classId": class_id, "fullName": "Kojo" }),
    );
    let kojo_id = str_field(&kojo, "id");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "conduct.save",
        json!({
            "studentId": abena_id,
            "classId": class_id,
            "term": 1,
            "conductId": respectful_id,
            "interestId": football_id,
            "attendance": 58
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "conduct.save",
        json!({ "studentId": abena_id, "classId": class_id, "term": 1, "conductId": respectful_id, "attendance": 60 }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "10",
        "conduct.save",
        json!({ "studentId": kojo_id, "classId": class_id, "term": 1, "interestId": "missing" }),
    );
    assert_eq!(e["code"], "not_found");
    let e = request_err(
        &mut stdin,
        &mut reader,
        "11",
        "conduct.save",
        json!({ "studentId": kojo_id, "classId": class_id, "term": 1, "attendance": -2 }),
    );
    assert_eq!(e["code"], "bad_params");

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "conduct.get",
        json!({ "classId": class_id, "term": 1 }),
    );
    let entries = got["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["studentId"], abena_id);
    assert_eq!(entries[0]["conduct"], "Respectful");
    assert!(entries[0]["interestId"].is_null());
    assert_eq!(entries[0]["attendance"], 60);
    assert_eq!(entries[1]["studentId"], kojo_id);
    assert!(entries[1]["conductId"].is_null());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "conduct.options.delete",
        json!({ "kind": "conduct", "id": respectful_id }),
    );
    let got = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "conduct.get",
        json!({ "classId": class_id, "term": 1, "studentId": abena_id }),
    );
    let entries = got["entries"].as_array().expect("entries");
    assert_eq!(entries.len(), 1);
    assert!(entries[0]["conductId"].is_null());
    assert_eq!(entries[0]["attendance"], 60);

    let options = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "conduct.options.list",
        json!({ "kind": "interest" }),
    );
    assert_eq!(options["options"][0]["name"], "Football");
}

#[test]
fn options_rename_and_entries_delete_per_term() {
    let workspace = temp_dir("resultsd-conduct-edit");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let quiet = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "conduct.options.add",
        json!({ "kind": "conduct", "name": "Quiet" }),
    );
    let quiet_id = str_field(&quiet, "id");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "conduct.options.add",
        json!({ "kind": "conduct", "name": "Hardworking" }),
    );

    // Same name with different case is taken by another option.
    let e = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "conduct.options.update",
        json!({ "kind": "conduct", "id": quiet_id, "name": "HARDWORKING" }),
    );
    assert_eq!(e["code"], "bad_params");

    // Re-casing its own name is fine.
    let renamed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "conduct.options.update",
        json!({ "kind": "conduct", "id": quiet_id, "name": "Calm and quiet" }),
    );
    assert_eq!(renamed["name"], "Calm and quiet");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "conduct.options.update",
        json!({ "kind": "conduct", "id": quiet_id, "name": "calm and quiet" }),
    );

    let e = request_err(
        &mut stdin,
        &mut reader,
        "7",
        "conduct.options.update",
        json!({ "kind": "interest", "id": quiet_id, "name": "Reading" }),
    );
    assert_eq!(e["code"], "not_found");

    let class = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "classes.upsert",
        json!({ "name": "Basic 1", "academicLevel": "Lower Primary" }),
    );
    let class_id = str_field(&class, "id");
    let student = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "students.upsert",
        json!({ "classId": class_id, "fullName": "Efua" }),
    );
    let student_id = str_field(&student, "id");

    for (i, term) in [1, 2].into_iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("save-{}", i),
            "conduct.save",
            json!({ "studentId": student_id, "classId": class_id, "term": term, "conductId": quiet_id, "attendance": 50 + term }),
        );
    }

    let got = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "conduct.get",
        json!({ "classId": class_id, "term": 1 }),
    );
    assert_eq!(got["entries"][0]["conduct"], "calm and quiet");

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "conduct.delete",
        json!({ "studentId": student_id, "classId": class_id, "term": 1 }),
    );
    assert_eq!(deleted["deleted"], true);

    let term1 = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "conduct.get",
        json!({ "classId": class_id, "term": 1 }),
    );
    assert!(term1["entries"][0]["conductId"].is_null());
    assert!(term1["entries"][0]["attendance"].is_null());

    let term2 = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "conduct.get",
        json!({ "classId": class_id, "term": 2 }),
    );
    assert_eq!(term2["entries"][0]["conductId"], quiet_id);
    assert_eq!(term2["entries"][0]["attendance"], 52);
}
