//! TF-IDF vector space model over tokenized documents.
//!
//! Idf is smoothed (`ln((1 + n) / (1 + df)) + 1`) and every transformed vector is
//! L2-normalized, so Euclidean distance and cosine similarity agree on ordering.

use std::collections::{BTreeSet, HashMap};

/// Sparse vector stored as `(term index, weight)` pairs sorted by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(usize, f64)>,
}

impl SparseVector {
    /// Builds a vector from arbitrary pairs; sorts by index and drops zero weights.
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.retain(|(_, w)| *w != 0.0);
        pairs.sort_by_key(|(i, _)| *i);
        Self { entries: pairs }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut a, mut b) = (0, 0);
        let mut sum = 0.0;
        while a < self.entries.len() && b < other.entries.len() {
            let (ia, wa) = self.entries[a];
            let (ib, wb) = other.entries[b];
            match ia.cmp(&ib) {
                std::cmp::Ordering::Less => a += 1,
                std::cmp::Ordering::Greater => b += 1,
                std::cmp::Ordering::Equal => {
                    sum += wa * wb;
                    a += 1;
                    b += 1;
                }
            }
        }
        sum
    }

    pub fn euclidean_distance(&self, other: &SparseVector) -> f64 {
        let (mut a, mut b) = (0, 0);
        let mut sum = 0.0;
        while a < self.entries.len() || b < other.entries.len() {
            let left = self.entries.get(a);
            let right = other.entries.get(b);
            let diff = match (left, right) {
                (Some(&(ia, wa)), Some(&(ib, wb))) if ia == ib => {
                    a += 1;
                    b += 1;
                    wa - wb
                }
                (Some(&(ia, wa)), Some(&(ib, _))) if ia < ib => {
                    a += 1;
                    wa
                }
                (Some(_), Some(&(_, wb))) => {
                    b += 1;
                    wb
                }
                (Some(&(_, wa)), None) => {
                    a += 1;
                    wa
                }
                (None, Some(&(_, wb))) => {
                    b += 1;
                    wb
                }
                (None, None) => break,
            };
            sum += diff * diff;
        }
        sum.sqrt()
    }

    /// Cosine similarity; zero when either vector is zero.
    pub fn cosine_similarity(&self, other: &SparseVector) -> f64 {
        let denom = self.norm() * other.norm();
        if denom == 0.0 {
            return 0.0;
        }
        (self.dot(other) / denom).clamp(-1.0, 1.0)
    }
}

/// Learned vocabulary and inverse document frequencies.
#[derive(Debug, Clone)]
pub struct TfIdfVectorizer {
    vocabulary: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
    sublinear_tf: bool,
}

impl TfIdfVectorizer {
    /// Fits vocabulary and idf on tokenized documents. Term indices follow
    /// alphabetical order. With `sublinear_tf`, `transform` weighs a term seen `tf`
    /// times by `1 + ln(tf)` instead of `tf`.
    pub fn fit_with(documents: &[Vec<String>], sublinear_tf: bool) -> Self {
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for doc in documents {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<String> = document_frequency.keys().map(|t| t.to_string()).collect();
        terms.sort();

        let n = documents.len() as f64;
        let idf = terms
            .iter()
            .map(|t| {
                let df = document_frequency[t.as_str()] as f64;
                ((1.0 + n) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let vocabulary = terms
            .iter()
            .enumerate()
            .map(|(i, t)| (t.clone(), i))
            .collect();

        Self {
            vocabulary,
            terms,
            idf,
            sublinear_tf,
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    pub fn term(&self, index: usize) -> Option<&str> {
        self.terms.get(index).map(String::as_str)
    }

    /// Transforms one tokenized document into an L2-normalized TF-IDF vector.
    /// Terms outside the fitted vocabulary are ignored.
    pub fn transform(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_insert(0) += 1;
            }
        }

        let weighted: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(index, count)| {
                let tf = if self.sublinear_tf {
                    1.0 + (count as f64).ln()
                } else {
                    count as f64
                };
                (index, tf * self.idf[index])
            })
            .collect();

        let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return SparseVector::default();
        }
        SparseVector::from_pairs(weighted.into_iter().map(|(i, w)| (i, w / norm)).collect())
    }

    /// The `n` heaviest terms of a transformed vector, heaviest first, ties by term.
    pub fn top_terms(&self, vector: &SparseVector, n: usize) -> Vec<(String, f64)> {
        let mut weighted: Vec<(String, f64)> = vector
            .entries()
            .iter()
            .filter_map(|&(i, w)| self.term(i).map(|t| (t.to_string(), w)))
            .collect();
        weighted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        weighted.truncate(n);
        weighted
    }
}

#[cfg(test)]
impl SparseVector {
    fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    fn get(&self, index: usize) -> f64 {
        self.entries
            .binary_search_by_key(&index, |(i, _)| *i)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
impl TfIdfVectorizer {
    fn fit(documents: &[Vec<String>]) -> Self {
        Self::fit_with(documents, false)
    }

    fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }
}
