use super::{GradingConfig, ResultFilter, ResultStore, ScoreStore, StoreError};
use crate::calc::bands::sort_by_min;
use crate::calc::{
    AcademicLevel, ComputedScore, FinalGradingBand, FinalResult, GradingBand, LevelScoreSettings,
    ResultLevel, SubjectScoreRecord, SubjectScoreRow, SubjectType,
};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

/// In-memory store for engine tests.
#[derive(Default)]
pub struct MemoryStore {
    pub settings: HashMap<AcademicLevel, LevelScoreSettings>,
    pub bands: Vec<GradingBand>,
    pub final_bands: Vec<FinalGradingBand>,
    pub subjects: HashMap<String, (String, SubjectType)>,
    pub scores: RefCell<BTreeMap<(String, String), SubjectScoreRecord>>,
    pub results: RefCell<BTreeMap<(String, String, i64), FinalResult>>,
    /// Student ids whose score reads fail as if the backend were down.
    pub unreachable_students: HashSet<String>,
}

impl MemoryStore {
    pub fn add_subject(&mut self, id: &str, name: &str, subject_type: SubjectType) {
        self.subjects
            .insert(id.to_string(), (name.to_string(), subject_type));
    }

    /// Seeds a persisted score row directly, bypassing computation.
    pub fn seed_score(
        &self,
        student_id: &str,
        class_id: &str,
        subject_id: &str,
        total: i64,
        grade: i64,
    ) {
        let record = SubjectScoreRecord {
            student_id: student_id.to_string(),
            class_id: class_id.to_string(),
            subject_id: subject_id.to_string(),
            academic_level: AcademicLevel::Jhs,
            class_score: None,
            exam_score: Some(total as f64),
            computed: ComputedScore {
                weighted_class_score: None,
                weighted_exam_score: None,
                total_score: total,
                grade,
                remark: String::new(),
            },
        };
        self.scores.borrow_mut().insert(
            (student_id.to_string(), subject_id.to_string()),
            record,
        );
    }
}

impl GradingConfig for MemoryStore {
    fn score_setting_for_level(
        &self,
        level: AcademicLevel,
    ) -> Result<Option<LevelScoreSettings>, StoreError> {
        Ok(self.settings.get(&level).cloned())
    }

    fn grading_bands(&self) -> Result<Vec<GradingBand>, StoreError> {
        let mut out = self.bands.clone();
        sort_by_min(&mut out);
        Ok(out)
    }

    fn final_grading_bands(
        &self,
        level: ResultLevel,
    ) -> Result<Vec<FinalGradingBand>, StoreError> {
        let mut out: Vec<FinalGradingBand> = self
            .final_bands
            .iter()
            .filter(|b| b.level == level)
            .cloned()
            .collect();
        sort_by_min(&mut out);
        Ok(out)
    }
}

impl ScoreStore for MemoryStore {
    fn student_scores(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<SubjectScoreRow>, StoreError> {
        if self.unreachable_students.contains(student_id) {
            return Err(StoreError::Unavailable("connection refused".to_string()));
        }
        Ok(self
            .scores
            .borrow()
            .values()
            .filter(|r| r.student_id == student_id && r.class_id == class_id)
            .map(|r| {
                let (name, subject_type) = self
                    .subjects
                    .get(&r.subject_id)
                    .cloned()
                    .unwrap_or_else(|| (r.subject_id.clone(), SubjectType::Other));
                SubjectScoreRow {
                    subject_id: r.subject_id.clone(),
                    subject_name: name,
                    subject_type,
                    total_score: r.computed.total_score,
                    grade: r.computed.grade,
                    remark: r.computed.remark.clone(),
                }
            })
            .collect())
    }

    fn upsert_subject_scores(&self, records: &[SubjectScoreRecord]) -> Result<(), StoreError> {
        let mut scores = self.scores.borrow_mut();
        for r in records {
            scores.insert((r.student_id.clone(), r.subject_id.clone()), r.clone());
        }
        Ok(())
    }
}

impl ResultStore for MemoryStore {
    fn upsert_final_results(&self, results: &[FinalResult]) -> Result<(), StoreError> {
        let mut stored = self.results.borrow_mut();
        for r in results {
            stored.insert(
                (r.student_id.clone(), r.class_id.clone(), r.term),
                r.clone(),
            );
        }
        Ok(())
    }

    fn final_results(&self, filter: &ResultFilter) -> Result<Vec<FinalResult>, StoreError> {
        Ok(self
            .results
            .borrow()
            .values()
            .filter(|r| {
                filter.student_id.as_deref().map_or(true, |s| s == r.student_id)
                    && filter.class_id.as_deref().map_or(true, |c| c == r.class_id)
                    && filter.term.map_or(true, |t| t == r.term)
            })
            .cloned()
            .collect())
    }
}
