//! Score computation and final-result aggregation.
//!
//! Pure over its inputs: settings, bands and scores come in through the
//! [`crate::store`] traits and every call re-reads them.

pub mod bands;
pub mod batch;
mod error;
pub mod final_result;
pub mod subject;
mod types;

pub use batch::generate_and_save_for_class;
pub use error::CalcError;
pub use final_result::{generate_final_result, FinalOutcome};
pub use subject::{compute_subject_score, save_subject_scores, RawSubjectScore, ScoreEntryContext};
pub use types::*;
