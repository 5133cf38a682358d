//! Cosine similarity and exact linear-scan ranking.

use ragroute_core::{Document, SearchResult};

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1]. Returns 0.0 for mismatched lengths, empty
/// vectors, and zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank documents by similarity to a query vector.
///
/// Scores are clamped to [0, 1]. Documents without embeddings are skipped,
/// anything below `min_score` is dropped, and at most `top_k` results come
/// back, best first. Equal scores keep insertion order.
pub fn rank_by_similarity<'a>(
    documents: impl IntoIterator<Item = &'a Document>,
    query: &[f32],
    top_k: usize,
    min_score: f32,
) -> Vec<SearchResult> {
    let mut scored: Vec<(f32, &Document)> = documents
        .into_iter()
        .filter_map(|doc| {
            let emb = doc.embedding.as_ref()?;
            let score = cosine_similarity(emb, query).clamp(0.0, 1.0);
            (score >= min_score).then_some((score, doc))
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
        .into_iter()
        .map(|(score, doc)| SearchResult {
            document: doc.clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragroute_core::DocumentSource;

    fn doc(id: &str, embedding: Option<Vec<f32>>) -> Document {
        let mut d = Document::new(format!("Content for {id}"), "u1", DocumentSource::Manual);
        d.id = id.into();
        d.embedding = embedding;
        d
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // [1,1] . [1,0] = 1, |[1,1]| = sqrt(2)
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn rank_orders_best_first() {
        let docs = vec![
            doc("a", Some(vec![0.0, 1.0, 0.0])),
            doc("b", Some(vec![1.0, 0.0, 0.0])),
            doc("c", Some(vec![0.5, 0.5, 0.0])),
        ];
        let results = rank_by_similarity(&docs, &[1.0, 0.0, 0.0], 10, 0.0);
        let ids: Vec<_> = results.iter().map(|r| r.document.id.as_str()).collect();
        assert_eq!(ids, ["b", "c", "a"]);
    }

    #[test]
    fn rank_picks_nearest_of_two() {
        let docs = vec![doc("x", Some(vec![1.0, 0.0, 0.0])), doc("z", Some(vec![0.0, 0.0, 1.0]))];
        let results = rank_by_similarity(&docs, &[0.9, 0.1, 0.0], 1, 0.0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, "x");
    }

    #[test]
    fn rank_clamps_negative_scores() {
        let docs = vec![doc("opposite", Some(vec![-1.0, 0.0]))];
        let results = rank_by_similarity(&docs, &[1.0, 0.0], 5, 0.0);
        assert_eq!(results[0].score, 0.0);
    }

    #[test]
    fn rank_respects_floor_and_limit() {
        let docs: Vec<_> = (0..10)
            .map(|i| doc(&format!("e{i}"), Some(vec![1.0, i as f32 * 0.3])))
            .collect();
        let results = rank_by_similarity(&docs, &[1.0, 0.0], 3, 0.5);
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.score >= 0.5));
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn rank_skips_missing_embeddings() {
        let docs = vec![doc("a", Some(vec![1.0, 0.0])), doc("b", None)];
        let results = rank_by_similarity(&docs, &[1.0, 0.0], 10, 0.0);
        assert_eq!(results.len(), 1);
    }
}
