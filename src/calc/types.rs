use super::error::CalcError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcademicLevel {
    #[serde(rename = "Nursery")]
    Nursery,
    #[serde(rename = "KG")]
    Kg,
    #[serde(rename = "Lower Primary")]
    LowerPrimary,
    #[serde(rename = "Upper Primary")]
    UpperPrimary,
    #[serde(rename = "JHS")]
    Jhs,
}

impl AcademicLevel {
    pub const ALL: [AcademicLevel; 5] = [
        Self::Nursery,
        Self::Kg,
        Self::LowerPrimary,
        Self::UpperPrimary,
        Self::Jhs,
    ];

    pub fn parse(raw: &str) -> Result<Self, CalcError> {
        let key = raw.trim().to_ascii_lowercase();
        match key.as_str() {
            "nursery" => Ok(Self::Nursery),
            "kg" | "kindergarten" => Ok(Self::Kg),
            "lower primary" => Ok(Self::LowerPrimary),
            "upper primary" => Ok(Self::UpperPrimary),
            "jhs" => Ok(Self::Jhs),
            _ => Err(CalcError::InvalidLevel(raw.to_string())),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Nursery => "Nursery",
            Self::Kg => "KG",
            Self::LowerPrimary => "Lower Primary",
            Self::UpperPrimary => "Upper Primary",
            Self::Jhs => "JHS",
        }
    }

    /// Final-result tier for this level; `None` for levels that get no final result.
    pub fn result_level(self) -> Option<ResultLevel> {
        match self {
            Self::Nursery | Self::Kg => None,
            Self::LowerPrimary | Self::UpperPrimary => Some(ResultLevel::Primary),
            Self::Jhs => Some(ResultLevel::Jhs),
        }
    }
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultLevel {
    Primary,
    Jhs,
}

impl ResultLevel {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "jhs" => Some(Self::Jhs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Jhs => "jhs",
        }
    }
}

/// Maps a class's academic level name onto its final-result tier.
///
/// Accepts the bare alias "primary" alongside the academic level names.
/// `Ok(None)` means the level is excluded from final results.
pub fn normalize_result_level(raw: &str) -> Result<Option<ResultLevel>, CalcError> {
    if raw.trim().eq_ignore_ascii_case("primary") {
        return Ok(Some(ResultLevel::Primary));
    }
    Ok(AcademicLevel::parse(raw)?.result_level())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    Core,
    Elective,
    Other,
}

impl SubjectType {
    /// Unknown or missing types collapse to `Other`.
    pub fn normalize(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("core") => Self::Core,
            Some("elective") => Self::Elective,
            _ => Self::Other,
        }
    }

    pub fn parse_strict(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "core" => Some(Self::Core),
            "elective" => Some(Self::Elective),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Elective => "elective",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelScoreSettings {
    pub academic_level: AcademicLevel,
    pub has_components: bool,
    pub class_weight: f64,
    pub exam_weight: f64,
    pub max_class_score: f64,
    pub max_exam_score: f64,
}

const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

impl LevelScoreSettings {
    /// Full admin-side validation: non-negative weights summing to 100 and
    /// positive maxima.
    pub fn validate(&self) -> Result<(), CalcError> {
        if self.class_weight < 0.0 || self.exam_weight < 0.0 {
            return Err(CalcError::InvalidSettings(
                "weights must be non-negative".to_string(),
            ));
        }
        let sum = self.class_weight + self.exam_weight;
        if (sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(CalcError::InvalidSettings(format!(
                "classWeight + examWeight must equal 100 (got {})",
                sum
            )));
        }
        self.check_maxima()
    }

    pub(crate) fn check_maxima(&self) -> Result<(), CalcError> {
        if !(self.max_class_score > 0.0) {
            return Err(CalcError::ZeroMaxScore {
                field: "maxClassScore",
            });
        }
        if !(self.max_exam_score > 0.0) {
            return Err(CalcError::ZeroMaxScore {
                field: "maxExamScore",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingBand {
    pub id: String,
    pub min_score: f64,
    pub max_score: f64,
    pub grade: i64,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalGradingBand {
    pub id: String,
    pub level: ResultLevel,
    pub min_value: f64,
    pub max_value: f64,
    pub final_grade: String,
    pub descriptor: Option<String>,
    pub remark: Option<String>,
}

/// Derived per-subject values. Never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedScore {
    pub weighted_class_score: Option<i64>,
    pub weighted_exam_score: Option<i64>,
    pub total_score: i64,
    pub grade: i64,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScoreRecord {
    pub student_id: String,
    pub class_id: String,
    pub subject_id: String,
    pub academic_level: AcademicLevel,
    pub class_score: Option<f64>,
    pub exam_score: Option<f64>,
    #[serde(flatten)]
    pub computed: ComputedScore,
}

/// Canonical read shape for a student's persisted subject scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectScoreRow {
    pub subject_id: String,
    pub subject_name: String,
    pub subject_type: SubjectType,
    pub total_score: i64,
    pub grade: i64,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
    pub student_id: String,
    pub class_id: String,
    pub term: i64,
    pub level: ResultLevel,
    pub grand_total: i64,
    pub aggregate: Option<i64>,
    pub final_grade: String,
    pub descriptor: Option<String>,
    pub remark: Option<String>,
}
