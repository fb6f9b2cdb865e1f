//! Collaborator interfaces the grading engine reads from and writes to.
//!
//! - [`GradingConfig`]: per-level score settings and both band tables
//! - [`ScoreStore`]: persisted per-subject score records
//! - [`ResultStore`]: persisted final results
//!
//! Lookups return `Ok(empty)` only when there is genuinely no data; an
//! unreachable backend is always `Err(StoreError::Unavailable)`.

#[cfg(test)]
pub mod memory;
pub mod sqlite;

use crate::calc::{
    AcademicLevel, FinalGradingBand, FinalResult, GradingBand, LevelScoreSettings, ResultLevel,
    SubjectScoreRecord, SubjectScoreRow,
};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store query failed: {0}")]
    Query(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "store_unavailable",
            Self::Query(_) => "db_query_failed",
        }
    }
}

pub trait GradingConfig {
    fn score_setting_for_level(
        &self,
        level: AcademicLevel,
    ) -> Result<Option<LevelScoreSettings>, StoreError>;

    /// Per-subject bands, ascending by `min_score`.
    fn grading_bands(&self) -> Result<Vec<GradingBand>, StoreError>;

    /// Final bands for one tier, ascending by `min_value`.
    fn final_grading_bands(&self, level: ResultLevel)
        -> Result<Vec<FinalGradingBand>, StoreError>;
}

pub trait ScoreStore {
    fn student_scores(
        &self,
        student_id: &str,
        class_id: &str,
    ) -> Result<Vec<SubjectScoreRow>, StoreError>;

    /// Upsert keyed by (student, subject). All rows land or none do.
    fn upsert_subject_scores(&self, records: &[SubjectScoreRecord]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct ResultFilter {
    pub student_id: Option<String>,
    pub class_id: Option<String>,
    pub term: Option<i64>,
}

pub trait ResultStore {
    /// Upsert keyed by (student, class, term). All rows land or none do.
    fn upsert_final_results(&self, results: &[FinalResult]) -> Result<(), StoreError>;

    fn final_results(&self, filter: &ResultFilter) -> Result<Vec<FinalResult>, StoreError>;
}
