use std::collections::HashMap;

/// Pluggable capability comparing two texts for meaning-level closeness.
///
/// Implementations return a similarity in [-1, 1] and absorb their own
/// failures; the scoring layer treats non-finite output as "unavailable".
pub trait SimilarityProvider: Send + Sync {
    fn similarity(&self, left: &str, right: &str) -> f64;
}

/// Deterministic bag-of-words cosine similarity over term-frequency vectors.
///
/// A lightweight stand-in for an embedding model: scores land in [0, 1]
/// since term frequencies are non-negative.
#[derive(Debug, Default, Clone, Copy)]
pub struct TermVectorSimilarity;

impl SimilarityProvider for TermVectorSimilarity {
    fn similarity(&self, left: &str, right: &str) -> f64 {
        cosine_similarity(&term_frequencies(left), &term_frequencies(right))
    }
}

/// Simple word-based tokenizer splitting on non-alphanumeric characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn term_frequencies(text: &str) -> HashMap<String, f64> {
    let mut freqs = HashMap::new();
    for term in tokenize(text) {
        *freqs.entry(term).or_insert(0.0) += 1.0;
    }
    freqs
}

fn cosine_similarity(vec_a: &HashMap<String, f64>, vec_b: &HashMap<String, f64>) -> f64 {
    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (term, weight) in vec_a {
        norm_a += weight * weight;
        if let Some(weight_b) = vec_b.get(term) {
            dot_product += weight * weight_b;
        }
    }

    for weight in vec_b.values() {
        norm_b += weight * weight;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_texts_score_one() {
        let provider = TermVectorSimilarity;
        let sim = provider.similarity("budget and timeline", "budget and timeline");
        assert!((sim - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_texts_score_zero() {
        let provider = TermVectorSimilarity;
        let sim = provider.similarity("apples oranges", "budget timeline");
        assert_eq!(sim, 0.0);
    }

    #[test]
    fn overlap_lands_between_zero_and_one() {
        let provider = TermVectorSimilarity;
        let sim = provider.similarity(
            "we discussed the budget in detail",
            "discusses project budget and timeline",
        );
        assert!(sim > 0.0);
        assert!(sim < 1.0);
    }

    #[test]
    fn empty_text_scores_zero() {
        let provider = TermVectorSimilarity;
        assert_eq!(provider.similarity("", "budget"), 0.0);
    }

    #[test]
    fn tokenizer_ignores_punctuation_and_case() {
        assert_eq!(tokenize("The Budget, the TIMELINE!"), vec![
            "the", "budget", "the", "timeline"
        ]);
    }
}
