use crate::scoring::rubric::Criterion;
use crate::scoring::similarity::SimilarityProvider;

/// Keyword coverage in [0, 1] plus the keywords that matched.
///
/// Case-insensitive substring containment against the full transcript. An
/// empty keyword set scores 1.0: no constraint means full credit, not zero.
pub fn keyword_score<'a>(transcript: &str, criterion: &'a Criterion) -> (f64, Vec<&'a str>) {
    if criterion.keywords.is_empty() {
        return (1.0, Vec::new());
    }

    let transcript_lower = transcript.to_lowercase();
    let found: Vec<&str> = criterion
        .keywords
        .iter()
        .filter(|keyword| transcript_lower.contains(keyword.as_str()))
        .map(String::as_str)
        .collect();

    (found.len() as f64 / criterion.keywords.len() as f64, found)
}

/// Semantic closeness in [0, 1], remapped from the provider's [-1, 1] range.
///
/// Falls back to `neutral` when no provider is wired, the criterion has no
/// description, or the provider emits a non-finite value. Provider trouble
/// never propagates past this function.
pub fn semantic_score(
    provider: Option<&dyn SimilarityProvider>,
    transcript: &str,
    criterion: &Criterion,
    neutral: f64,
) -> f64 {
    let Some(provider) = provider else {
        return neutral;
    };
    if criterion.description.trim().is_empty() {
        return neutral;
    }

    let sim = provider.similarity(transcript, &criterion.description);
    if !sim.is_finite() {
        return neutral;
    }

    ((sim + 1.0) / 2.0).clamp(0.0, 1.0)
}

/// Length conformance: fixed penalties, not graduated ones, so scores stay
/// deterministic and explainable. Both bounds are inclusive, and the min
/// check runs before the max check.
pub fn length_score(
    transcript: &str,
    criterion: &Criterion,
    short_penalty: f64,
    long_penalty: f64,
) -> (f64, String) {
    let count = word_count(transcript);

    if let Some(min) = criterion.min_words {
        if count < min {
            return (short_penalty, format!("Too short (needs \u{2265} {min})"));
        }
    }
    if let Some(max) = criterion.max_words {
        if count > max {
            return (long_penalty, format!("Too long (limit \u{2264} {max})"));
        }
    }

    (1.0, "Length OK".to_string())
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
