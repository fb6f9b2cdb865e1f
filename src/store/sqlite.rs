use super::{GradingConfig, ResultFilter, ResultStore, ScoreStore, StoreError};
use crate::calc::{
    AcademicLevel, FinalGradingBand, FinalResult, GradingBand, LevelScoreSettings, ResultLevel,
    SubjectScoreRecord, SubjectScoreRow, SubjectType,
};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension};
use uuid::Uuid;

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(f, _)
                if matches!(
                    f.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen
                ) =>
            {
                StoreError::Unavailable(e.to_string())
            }
            _ => StoreError::Query(e.to_string()),
        }
    }
}

pub fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

fn parse_result_level(raw: String) -> Result<ResultLevel, StoreError> {
    ResultLevel::parse(&raw).ok_or_else(|| StoreError::Query(format!("unknown result level: {}", raw)))
}

impl GradingConfig for SqliteStore<'_> {
    fn score_setting_for_level(
        &self,
        level: AcademicLevel,
    ) -> Result<Option<LevelScoreSettings>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT has_components, class_weight, exam_weight, max_class_score, max_exam_score
                 FROM score_settings
                 WHERE academic_level = ?",
                [level.label()],
                |r| {
                    Ok(LevelScoreSettings {
                        academic_level: level,
                        has_components: r.get::<_, i64>(0)? != 0,
                        class_weight: r.get(1)?,
                        exam_weight: r.get(2)?,
                        max_class_score: r.get(3)?,
                        max_exam_score: r.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    fn grading_bands(&self) -> Result<Vec<GradingBand>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, min_score, max_score, grade, remark
             FROM grading_scales
             ORDER BY min_score",
        )?;
        let bands = stmt
            .query_map([], |r| {
                Ok(GradingBand {
                    id: r.get(0)?,
                    min_score: r.get(1)?,
                    max_score: r.get(2)?,
                    grade: r.get(3)?,
                    remark: r.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bands)
    }

    fn final_grading_bands(
        &self,
        level: ResultLevel,
    ) -> Result<Vec<FinalGradingBand>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, min_value, max_value, final_grade, descriptor, remark
             FROM final_grading_scales
             WHERE level = ?
             ORDER BY min_value",
        )?;
        let bands = stmt
            .query_map([level.as_str()], |r| {
                Ok(FinalGradingBand {
                    id: r.get(0)?,
                    level,
                    min_value: r.get(1)?,
                    max_value: r.get(2)?,
                    final_grade: r.get(3)?,
                    descriptor: r.get(4)?,
                    remark: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bands)
    }
}

impl ScoreStore for SqliteStore<'_> {
    fn student_scores(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<SubjectScoreRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ss.subject_id, COALESCE(sub.name, ss.subject_id), sub.subject_type,
                    ss.total_score, ss.grade, ss.remark
             FROM student_scores ss
             LEFT JOIN subjects sub ON sub.id = ss.subject_id
             WHERE ss.student_id = ? AND ss.class_id = ?
             ORDER BY sub.name, ss.subject_id",
        )?;
        let rows = stmt
            .query_map((student_id, class_id), |r| {
                let subject_type: Option<String> = r.get(2)?;
                Ok(SubjectScoreRow {
                    subject_id: r.get(0)?,
                    subject_name: r.get(1)?,
                    subject_type: SubjectType::normalize(subject_type.as_deref()),
                    total_score: r.get(3)?,
                    grade: r.get(4)?,
                    remark: r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert_subject_scores(&self, records: &[SubjectScoreRecord]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let stamp = now_stamp();
        for rec in records {
            tx.execute(
                "INSERT INTO student_scores(
                    id, student_id, class_id, subject_id, academic_level,
                    class_score, exam_score, weighted_class_score, weighted_exam_score,
                    total_score, grade, remark, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(student_id, subject_id) DO UPDATE SET
                   class_id = excluded.class_id,
                   academic_level = excluded.academic_level,
                   class_score = excluded.class_score,
                   exam_score = excluded.exam_score,
                   weighted_class_score = excluded.weighted_class_score,
                   weighted_exam_score = excluded.weighted_exam_score,
                   total_score = excluded.total_score,
                   grade = excluded.grade,
                   remark = excluded.remark,
                   updated_at = excluded.updated_at",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    rec.student_id,
                    rec.class_id,
                    rec.subject_id,
                    rec.academic_level.label(),
                    rec.class_score,
                    rec.exam_score,
                    rec.computed.weighted_class_score,
                    rec.computed.weighted_exam_score,
                    rec.computed.total_score,
                    rec.computed.grade,
                    rec.computed.remark,
                    stamp,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl ResultStore for SqliteStore<'_> {
    fn upsert_final_results(&self, results: &[FinalResult]) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let stamp = now_stamp();
        for r in results {
            tx.execute(
                "INSERT INTO student_final_results(
                    id, student_id, class_id, term, level, grand_total, aggregate,
                    final_grade, descriptor, remark, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(student_id, class_id, term) DO UPDATE SET
                   level = excluded.level,
                   grand_total = excluded.grand_total,
                   aggregate = excluded.aggregate,
                   final_grade = excluded.final_grade,
                   descriptor = excluded.descriptor,
                   remark = excluded.remark,
                   updated_at = excluded.updated_at",
                rusqlite::params![
                    Uuid::new_v4().to_string(),
                    r.student_id,
                    r.class_id,
                    r.term,
                    r.level.as_str(),
                    r.grand_total,
                    r.aggregate,
                    r.final_grade,
                    r.descriptor,
                    r.remark,
                    stamp,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn final_results(&self, filter: &ResultFilter) -> Result<Vec<FinalResult>, StoreError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(s) = &filter.student_id {
            clauses.push("r.student_id = ?");
            bind_values.push(Value::Text(s.clone()));
        }
        if let Some(c) = &filter.class_id {
            clauses.push("r.class_id = ?");
            bind_values.push(Value::Text(c.clone()));
        }
        if let Some(t) = filter.term {
            clauses.push("r.term = ?");
            bind_values.push(Value::Integer(t));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let sql = format!(
            "SELECT r.student_id, r.class_id, r.term, r.level, r.grand_total, r.aggregate,
                    r.final_grade, r.descriptor, r.remark
             FROM student_final_results r
             LEFT JOIN students st ON st.id = r.student_id
             {}
             ORDER BY r.class_id, r.term, st.sort_order, r.student_id",
            where_sql
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map(params_from_iter(bind_values), |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, i64>(4)?,
                    r.get::<_, Option<i64>>(5)?,
                    r.get::<_, String>(6)?,
                    r.get::<_, Option<String>>(7)?,
                    r.get::<_, Option<String>>(8)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter()
            .map(
                |(student_id, class_id, term, level, grand_total, aggregate, final_grade, descriptor, remark)| {
                    Ok(FinalResult {
                        student_id,
                        class_id,
                        term,
                        level: parse_result_level(level)?,
                        grand_total,
                        aggregate,
                        final_grade,
                        descriptor,
                        remark,
                    })
                },
            )
            .collect()
    }
}
