use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE_NAME: &str = "results.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            academic_level TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            subject_type TEXT NOT NULL DEFAULT 'core'
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            full_name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_class_sort ON students(class_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS class_subjects(
            id TEXT PRIMARY KEY,
            class_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            FOREIGN KEY(class_id) REFERENCES classes(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            UNIQUE(class_id, subject_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS score_settings(
            academic_level TEXT PRIMARY KEY,
            has_components INTEGER NOT NULL,
            class_weight REAL NOT NULL,
            exam_weight REAL NOT NULL,
            max_class_score REAL NOT NULL,
            max_exam_score REAL NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grading_scales(
            id TEXT PRIMARY KEY,
            min_score REAL NOT NULL,
            max_score REAL NOT NULL,
            grade INTEGER NOT NULL,
            remark TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS final_grading_scales(
            id TEXT PRIMARY KEY,
            level TEXT NOT NULL,
            min_value REAL NOT NULL,
            max_value REAL NOT NULL,
            final_grade TEXT NOT NULL,
            descriptor TEXT,
            remark TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_final_grading_scales_level ON final_grading_scales(level)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_scores(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            subject_id TEXT NOT NULL,
            academic_level TEXT NOT NULL,
            class_score REAL,
            exam_score REAL,
            weighted_class_score INTEGER,
            weighted_exam_score INTEGER,
            total_score INTEGER NOT NULL,
            grade INTEGER NOT NULL,
            remark TEXT NOT NULL,
            updated_at TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            FOREIGN KEY(subject_id) REFERENCES subjects(id),
            UNIQUE(student_id, subject_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_student_scores_student_class ON student_scores(student_id, class_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_final_results(
            id TEXT PRIMARY KEY,
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            term INTEGER NOT NULL,
            level TEXT NOT NULL,
            grand_total INTEGER NOT NULL,
            aggregate INTEGER,
            final_grade TEXT NOT NULL,
            descriptor TEXT,
            remark TEXT,
            updated_at TEXT,
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            UNIQUE(student_id, class_id, term)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_final_results_class_term ON student_final_results(class_id, term)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS conduct_settings(
            id TEXT PRIMARY KEY,
            conduct_name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS interest_settings(
            id TEXT PRIMARY KEY,
            interest_name TEXT NOT NULL UNIQUE
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS student_conduct_interest(
            student_id TEXT NOT NULL,
            class_id TEXT NOT NULL,
            term INTEGER NOT NULL,
            conduct_id TEXT,
            interest_id TEXT,
            attendance INTEGER,
            updated_at TEXT,
            PRIMARY KEY(student_id, class_id, term),
            FOREIGN KEY(student_id) REFERENCES students(id),
            FOREIGN KEY(class_id) REFERENCES classes(id),
            FOREIGN KEY(conduct_id) REFERENCES conduct_settings(id),
            FOREIGN KEY(interest_id) REFERENCES interest_settings(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_conduct_interest_class ON student_conduct_interest(class_id, term)",
        [],
    )?;

    Ok(conn)
}
