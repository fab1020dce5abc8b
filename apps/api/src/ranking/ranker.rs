//! Resume Ranker: pluggable, trait-based ranking of candidate resumes against a query.
//!
//! Default: `KnnRanker` (TF-IDF vector space + k-nearest-neighbour search, pure Rust,
//! deterministic). `AppState` holds an `Arc<dyn Ranker>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::document::DocumentRow;
use crate::ranking::knn::{Metric, NearestNeighbors};
use crate::ranking::summary::summarize;
use crate::ranking::text::tokenize;
use crate::ranking::tfidf::{SparseVector, TfIdfVectorizer};

/// Number of heaviest query terms checked for matched/missing reporting.
const REPORTED_QUERY_TERMS: usize = 10;

const STRONG_MATCH_SCORE: u32 = 60;
const PARTIAL_MATCH_SCORE: u32 = 30;

// ────────────────────────────────────────────────────────────────────────────
// Input / output data models
// ────────────────────────────────────────────────────────────────────────────

/// What the candidates are ranked against: a job description or a search string.
#[derive(Debug, Clone)]
pub struct RankQuery {
    /// Shown back in the report (job description filename or the search text).
    pub label: String,
    pub text: String,
}

/// A resume as seen by the ranker.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub document_id: Uuid,
    pub filename: String,
    pub text: String,
}

impl From<DocumentRow> for Candidate {
    fn from(row: DocumentRow) -> Self {
        Self {
            document_id: row.id,
            filename: row.filename,
            text: row.extracted_text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResume {
    pub rank: usize,
    pub document_id: Uuid,
    pub filename: String,
    /// Distance to the query under the configured metric; smaller is closer.
    pub distance: f64,
    /// Cosine similarity to the query, between 0.0 and 1.0.
    pub similarity: f64,
    pub score: u32, // 0..=100
    pub matched_terms: Vec<String>,
    pub missing_terms: Vec<String>,
    pub summary: String,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    pub query: String,
    pub metric: Metric,
    pub total_candidates: usize,
    pub results: Vec<RankedResume>,
    pub ranker_backend: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Ranks candidates against a query. Implement this to swap the ranking backend
/// without touching handlers.
#[async_trait]
pub trait Ranker: Send + Sync {
    async fn rank(
        &self,
        query: RankQuery,
        candidates: Vec<Candidate>,
        top_k: Option<usize>,
    ) -> Result<RankingReport, AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// KnnRanker (default implementation)
// ────────────────────────────────────────────────────────────────────────────

/// TF-IDF + nearest-neighbour ranker.
///
/// Algorithm:
/// 1. Tokenize query and candidates (candidates sorted by filename first)
/// 2. Fit TF-IDF on candidates + query, transform everything to unit vectors
/// 3. `kneighbors(query, top_k)` under the configured metric
/// 4. Annotate each hit with matched/missing query terms, a summary and a recommendation
#[derive(Debug, Clone)]
pub struct KnnRanker {
    pub metric: Metric,
    pub summary_sentences: usize,
    pub sublinear_tf: bool,
}

impl KnnRanker {
    pub fn new(metric: Metric, summary_sentences: usize) -> Self {
        Self {
            metric,
            summary_sentences,
            sublinear_tf: false,
        }
    }

    pub fn with_sublinear_tf(mut self, sublinear_tf: bool) -> Self {
        self.sublinear_tf = sublinear_tf;
        self
    }
}

#[async_trait]
impl Ranker for KnnRanker {
    async fn rank(
        &self,
        query: RankQuery,
        candidates: Vec<Candidate>,
        top_k: Option<usize>,
    ) -> Result<RankingReport, AppError> {
        let ranker = self.clone();
        // CPU-bound pass; keep it off the async executor.
        tokio::task::spawn_blocking(move || ranker.rank_sync(&query, candidates, top_k))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in ranking: {e}")))?
    }
}

impl KnnRanker {
    pub fn rank_sync(
        &self,
        query: &RankQuery,
        mut candidates: Vec<Candidate>,
        top_k: Option<usize>,
    ) -> Result<RankingReport, AppError> {
        if top_k == Some(0) {
            return Err(AppError::Validation("top_k must be at least 1".to_string()));
        }

        let query_tokens = tokenize(&query.text);
        if query_tokens.is_empty() {
            return Err(AppError::Validation(format!(
                "'{}' contains no searchable terms",
                query.label
            )));
        }

        candidates.sort_by(|a, b| a.filename.cmp(&b.filename));
        let total_candidates = candidates.len();

        let candidate_tokens: Vec<Vec<String>> =
            candidates.iter().map(|c| tokenize(&c.text)).collect();

        let mut corpus = candidate_tokens.clone();
        corpus.push(query_tokens.clone());
        let vectorizer = TfIdfVectorizer::fit_with(&corpus, self.sublinear_tf);
        debug!(
            "Fitted {} terms over {} candidate(s)",
            vectorizer.vocabulary_size(),
            total_candidates
        );

        let query_vector = vectorizer.transform(&query_tokens);
        let candidate_vectors: Vec<SparseVector> = candidate_tokens
            .iter()
            .map(|tokens| vectorizer.transform(tokens))
            .collect();

        let key_terms = vectorizer.top_terms(&query_vector, REPORTED_QUERY_TERMS);
        let nn = NearestNeighbors::fit(self.metric, candidate_vectors);
        let k = top_k.unwrap_or(total_candidates);

        let results = nn
            .kneighbors(&query_vector, k)
            .into_iter()
            .enumerate()
            .map(|(position, neighbor)| {
                let candidate = &candidates[neighbor.index];
                let tokens = &candidate_tokens[neighbor.index];
                let similarity = query_vector
                    .cosine_similarity(nn.point(neighbor.index))
                    .clamp(0.0, 1.0);
                let score = (similarity * 100.0).round() as u32;

                let (matched_terms, missing_terms): (Vec<_>, Vec<_>) = key_terms
                    .iter()
                    .map(|(term, _)| term.clone())
                    .partition(|term| tokens.iter().any(|t| t == term));

                let recommendation = build_recommendation(score, &missing_terms);

                RankedResume {
                    rank: position + 1,
                    document_id: candidate.document_id,
                    filename: candidate.filename.clone(),
                    distance: neighbor.distance,
                    similarity,
                    score,
                    matched_terms,
                    missing_terms,
                    summary: summarize(&candidate.text, self.summary_sentences),
                    recommendation,
                }
            })
            .collect();

        Ok(RankingReport {
            query: query.label.clone(),
            metric: self.metric,
            total_candidates,
            results,
            ranker_backend: "knn-tfidf".to_string(),
        })
    }
}

/// Builds a human-readable recommendation from score and missing terms.
fn build_recommendation(score: u32, missing: &[String]) -> String {
    let top_missing: Vec<&str> = missing.iter().take(3).map(String::as_str).collect();

    if score >= STRONG_MATCH_SCORE {
        "Strong match. The resume covers the key terms of the query.".to_string()
    } else if score >= PARTIAL_MATCH_SCORE {
        if top_missing.is_empty() {
            format!("Partial match ({score}/100).")
        } else {
            format!(
                "Partial match ({score}/100). Missing: {}.",
                top_missing.join(", ")
            )
        }
    } else {
        format!("Weak match ({score}/100).")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(filename: &str, text: &str) -> Candidate {
        Candidate {
            document_id: Uuid::new_v4(),
            filename: filename.to_string(),
            text: text.to_string(),
        }
    }

    fn query(text: &str) -> RankQuery {
        RankQuery {
            label: "backend.txt".to_string(),
            text: text.to_string(),
        }
    }

    fn corpus() -> Vec<Candidate> {
        vec![
            candidate(
                "chef.txt",
                "Head chef. Managed kitchen staff and menu planning for a busy restaurant.",
            ),
            candidate(
                "rustacean.txt",
                "Backend engineer writing Rust services. Built Kafka pipelines and Postgres storage.",
            ),
            candidate(
                "pythonista.txt",
                "Backend engineer writing Python services with Django and Postgres.",
            ),
        ]
    }

    const JD: &str = "Backend engineer for Rust services, Kafka and Postgres.";

    #[test]
    fn test_most_similar_resume_ranks_first() {
        let ranker = KnnRanker::new(Metric::Euclidean, 2);
        let report = ranker.rank_sync(&query(JD), corpus(), None).unwrap();

        let order: Vec<&str> = report.results.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(order, vec!["rustacean.txt", "pythonista.txt", "chef.txt"]);
        assert_eq!(report.total_candidates, 3);
        assert_eq!(report.results[0].rank, 1);
        assert_eq!(report.results[2].rank, 3);
        assert_eq!(report.ranker_backend, "knn-tfidf");
    }

    #[test]
    fn test_distances_ascend_and_similarities_descend() {
        let ranker = KnnRanker::new(Metric::Euclidean, 2);
        let report = ranker.rank_sync(&query(JD), corpus(), None).unwrap();
        for pair in report.results.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[test]
    fn test_cosine_metric_gives_same_order() {
        let euclid = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query(JD), corpus(), None)
            .unwrap();
        let cosine = KnnRanker::new(Metric::Cosine, 1)
            .rank_sync(&query(JD), corpus(), None)
            .unwrap();
        let a: Vec<_> = euclid.results.iter().map(|r| &r.filename).collect();
        let b: Vec<_> = cosine.results.iter().map(|r| &r.filename).collect();
        assert_eq!(a, b);
        assert_eq!(cosine.metric, Metric::Cosine);
    }

    #[test]
    fn test_unrelated_resume_scores_zero() {
        let report = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query(JD), corpus(), None)
            .unwrap();
        let chef = report.results.iter().find(|r| r.filename == "chef.txt").unwrap();
        assert_eq!(chef.score, 0);
        assert!((chef.distance - 2.0_f64.sqrt()).abs() < 1e-9);
        assert!(chef.matched_terms.is_empty());
        assert!(chef.recommendation.starts_with("Weak match"));
    }

    #[test]
    fn test_matched_and_missing_terms() {
        let report = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query(JD), corpus(), None)
            .unwrap();
        let py = report
            .results
            .iter()
            .find(|r| r.filename == "pythonista.txt")
            .unwrap();
        assert!(py.matched_terms.contains(&"postgres".to_string()));
        assert!(py.missing_terms.contains(&"rust".to_string()));
        assert!(py.missing_terms.contains(&"kafka".to_string()));
        let all = py.matched_terms.len() + py.missing_terms.len();
        assert_eq!(all, tokenize(JD).len());
    }

    #[test]
    fn test_top_k_truncates() {
        let report = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query(JD), corpus(), Some(1))
            .unwrap();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].filename, "rustacean.txt");
        assert_eq!(report.total_candidates, 3);
    }

    #[test]
    fn test_zero_top_k_rejected() {
        let err = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query(JD), corpus(), Some(0))
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_query_without_terms_rejected() {
        let err = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query("the and of 2024"), corpus(), None)
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_no_candidates_gives_empty_report() {
        let report = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query(JD), vec![], None)
            .unwrap();
        assert!(report.results.is_empty());
        assert_eq!(report.total_candidates, 0);
        assert_eq!(report.query, "backend.txt");
    }

    #[test]
    fn test_identical_resumes_tie_by_filename() {
        let text = "Rust engineer";
        let report = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(
                &query("Rust engineer"),
                vec![candidate("b.txt", text), candidate("a.txt", text)],
                None,
            )
            .unwrap();
        assert_eq!(report.results[0].filename, "a.txt");
        assert_eq!(report.results[1].filename, "b.txt");
        assert_eq!(report.results[0].score, 100);
        assert!(report.results[0].recommendation.starts_with("Strong match"));
    }

    #[tokio::test]
    async fn test_async_rank_matches_sync() {
        let ranker = KnnRanker::new(Metric::Euclidean, 1);
        let report = ranker.rank(query(JD), corpus(), None).await.unwrap();
        assert_eq!(report.results[0].filename, "rustacean.txt");
    }

    #[test]
    fn test_sublinear_tf_keeps_best_match_first() {
        let ranker = KnnRanker::new(Metric::Euclidean, 1).with_sublinear_tf(true);
        assert!(ranker.sublinear_tf);
        let report = ranker.rank_sync(&query(JD), corpus(), None).unwrap();
        assert_eq!(report.results[0].filename, "rustacean.txt");
    }

    #[test]
    fn test_sublinear_tf_changes_distances_for_repeated_terms() {
        let candidates = || {
            vec![
                candidate("a.txt", "Rust Rust Rust Rust Kafka"),
                candidate("b.txt", "Kafka"),
            ]
        };
        let raw = KnnRanker::new(Metric::Euclidean, 1)
            .rank_sync(&query("Rust Kafka"), candidates(), None)
            .unwrap();
        let damped = KnnRanker::new(Metric::Euclidean, 1)
            .with_sublinear_tf(true)
            .rank_sync(&query("Rust Kafka"), candidates(), None)
            .unwrap();
        let distance = |report: &RankingReport| {
            report
                .results
                .iter()
                .find(|r| r.filename == "a.txt")
                .map(|r| r.distance)
                .unwrap()
        };
        assert!(distance(&damped) < distance(&raw));
    }

    #[test]
    fn test_recommendation_partial_lists_missing() {
        let rec = build_recommendation(45, &["kafka".to_string(), "rust".to_string()]);
        assert!(rec.contains("45"));
        assert!(rec.contains("kafka, rust"));
    }

    #[test]
    fn test_recommendation_partial_without_missing() {
        assert_eq!(build_recommendation(30, &[]), "Partial match (30/100).");
    }
}
