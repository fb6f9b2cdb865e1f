use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("score settings not found for academic level {0}")]
    NoScoreSettings(String),
    #[error("{field} must be greater than zero in weighted mode")]
    ZeroMaxScore { field: &'static str },
    #[error("invalid academic level: {0}")]
    InvalidLevel(String),
    #[error("no grading band for value {0}")]
    NoGradingBand(f64),
    #[error("invalid {field}: {value}")]
    InvalidScore { field: &'static str, value: f64 },
    #[error("invalid settings: {0}")]
    InvalidSettings(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CalcError {
    /// Stable machine code used in IPC error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoScoreSettings(_) => "no_score_settings",
            Self::ZeroMaxScore { .. } => "zero_max_score",
            Self::InvalidLevel(_) => "invalid_level",
            Self::NoGradingBand(_) => "no_grading_band",
            Self::InvalidScore { .. } => "invalid_score",
            Self::InvalidSettings(_) => "invalid_settings",
            Self::Store(e) => e.code(),
        }
    }
}
