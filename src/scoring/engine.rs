use crate::scoring::features;
use crate::scoring::rubric::{Criterion, Rubric};
use crate::scoring::similarity::SimilarityProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Blend weights and penalty constants for the scoring formula.
///
/// The defaults are compatibility constants, preserved exactly; treat them
/// as tunable parameters rather than derived values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringTunables {
    pub keyword_weight: f64,
    pub semantic_weight: f64,
    pub length_weight: f64,
    pub short_penalty: f64,
    pub long_penalty: f64,
    pub neutral_semantic: f64,
}

impl Default for ScoringTunables {
    fn default() -> Self {
        Self {
            keyword_weight: 0.4,
            semantic_weight: 0.4,
            length_weight: 0.2,
            short_penalty: 0.3,
            long_penalty: 0.4,
            neutral_semantic: 0.5,
        }
    }
}

/// Per-criterion slice of a score report, in catalog order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion_name: String,
    pub metric: String,
    /// Percentage in [0, 100], rounded to 2 decimals.
    pub score: f64,
    pub feedback: String,
}

/// Complete result of one scoring call. Built fresh per call, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Weighted mean of all criterion scores, as a percentage in [0, 100].
    pub overall_score: f64,
    /// Word count of the trimmed transcript.
    pub word_count: usize,
    pub criteria: Vec<CriterionScore>,
}

/// Scores transcripts against a fixed rubric.
///
/// Holds only read-only state (the catalog and an optional similarity
/// provider resolved once at construction), so one instance can serve
/// concurrent calls.
pub struct TranscriptScorer {
    rubric: Rubric,
    similarity: Option<Arc<dyn SimilarityProvider>>,
    tunables: ScoringTunables,
}

struct CriterionEvaluation {
    combined: f64,
    feedback: String,
}

impl TranscriptScorer {
    pub fn new(rubric: Rubric, similarity: Option<Arc<dyn SimilarityProvider>>) -> Self {
        Self::with_tunables(rubric, similarity, ScoringTunables::default())
    }

    pub fn with_tunables(
        rubric: Rubric,
        similarity: Option<Arc<dyn SimilarityProvider>>,
        tunables: ScoringTunables,
    ) -> Self {
        Self {
            rubric,
            similarity,
            tunables,
        }
    }

    pub fn rubric(&self) -> &Rubric {
        &self.rubric
    }

    /// Score a transcript against every rubric criterion.
    ///
    /// `duration_sec` is accepted but inert, reserved for pacing-based
    /// criteria. Callers are expected to reject empty transcripts before
    /// reaching the engine; an empty string still yields a complete report.
    pub fn score(&self, transcript: &str, duration_sec: Option<f64>) -> ScoreReport {
        let transcript = transcript.trim();
        let word_count = features::word_count(transcript);
        debug!(word_count, ?duration_sec, "scoring transcript");

        let total_weight = self.rubric.total_weight();
        let mut weighted_sum = 0.0;
        let mut criteria = Vec::with_capacity(self.rubric.len());

        for criterion in self.rubric.criteria() {
            let evaluation = self.evaluate(transcript, criterion);
            weighted_sum += evaluation.combined * criterion.weight;
            criteria.push(CriterionScore {
                criterion_name: criterion.name.clone(),
                metric: criterion.metric.clone(),
                score: round2(evaluation.combined * 100.0),
                feedback: evaluation.feedback,
            });
        }

        ScoreReport {
            overall_score: round2(weighted_sum / total_weight * 100.0),
            word_count,
            criteria,
        }
    }

    /// Blend the three feature scores for one criterion.
    ///
    /// Feedback carries only the length message; keyword and semantic
    /// detail stays at debug level.
    fn evaluate(&self, transcript: &str, criterion: &Criterion) -> CriterionEvaluation {
        let (kw_score, found) = features::keyword_score(transcript, criterion);
        let sem_score = features::semantic_score(
            self.similarity.as_deref(),
            transcript,
            criterion,
            self.tunables.neutral_semantic,
        );
        let (len_score, feedback) = features::length_score(
            transcript,
            criterion,
            self.tunables.short_penalty,
            self.tunables.long_penalty,
        );

        debug!(
            criterion = %criterion.id,
            kw_score,
            matched = found.len(),
            sem_score,
            len_score,
            "criterion evaluated"
        );

        let combined = self.tunables.keyword_weight * kw_score
            + self.tunables.semantic_weight * sem_score
            + self.tunables.length_weight * len_score;

        CriterionEvaluation { combined, feedback }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
