//! Rubric scoring engine: a transcript goes in, a weighted per-criterion
//! breakdown and an overall percentage come out.

pub mod engine;
pub mod features;
pub mod rubric;
pub mod similarity;

pub use engine::{CriterionScore, ScoreReport, ScoringTunables, TranscriptScorer};
pub use rubric::{Criterion, Rubric, RubricError};
pub use similarity::{SimilarityProvider, TermVectorSimilarity};
