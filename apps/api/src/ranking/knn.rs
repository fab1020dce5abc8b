//! Brute-force k-nearest-neighbour search over sparse TF-IDF vectors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ranking::tfidf::SparseVector;

/// Distance metric used by the neighbour search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Straight-line distance (Minkowski p=2).
    #[default]
    Euclidean,
    /// `1 - cosine similarity`.
    Cosine,
}

impl Metric {
    pub fn distance(&self, a: &SparseVector, b: &SparseVector) -> f64 {
        match self {
            Metric::Euclidean => a.euclidean_distance(b),
            Metric::Cosine => 1.0 - a.cosine_similarity(b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Euclidean => "euclidean",
            Metric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown metric '{0}'")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "euclidean" | "minkowski" => Ok(Metric::Euclidean),
            "cosine" => Ok(Metric::Cosine),
            other => Err(UnknownMetric(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position of the point in the fitted set.
    pub index: usize,
    pub distance: f64,
}

pub struct NearestNeighbors {
    metric: Metric,
    points: Vec<SparseVector>,
}

impl NearestNeighbors {
    pub fn fit(metric: Metric, points: Vec<SparseVector>) -> Self {
        Self { metric, points }
    }

    pub fn point(&self, index: usize) -> &SparseVector {
        &self.points[index]
    }

    /// Returns at most `k` neighbours of `query`, closest first. Equal distances
    /// keep fitted order.
    pub fn kneighbors(&self, query: &SparseVector, k: usize) -> Vec<Neighbor> {
        let mut neighbors: Vec<Neighbor> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, point)| Neighbor {
                index,
                distance: self.metric.distance(query, point),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        neighbors.truncate(k);
        neighbors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(pairs: &[(usize, f64)]) -> SparseVector {
        SparseVector::from_pairs(pairs.to_vec())
    }

    #[test]
    fn test_closest_first() {
        let nn = NearestNeighbors::fit(
            Metric::Euclidean,
            vec![point(&[(1, 1.0)]), point(&[(0, 1.0)]), point(&[(0, 0.8), (1, 0.6)])],
        );
        let result = nn.kneighbors(&point(&[(0, 1.0)]), 3);
        let order: Vec<usize> = result.iter().map(|n| n.index).collect();
        assert_eq!(order, vec![1, 2, 0]);
        assert_eq!(result[0].distance, 0.0);
    }

    #[test]
    fn test_k_limits_results() {
        let nn = NearestNeighbors::fit(
            Metric::Euclidean,
            vec![point(&[(0, 1.0)]), point(&[(1, 1.0)]), point(&[(2, 1.0)])],
        );
        assert_eq!(nn.kneighbors(&point(&[(0, 1.0)]), 1).len(), 1);
        assert_eq!(nn.kneighbors(&point(&[(0, 1.0)]), 10).len(), 3);
    }

    #[test]
    fn test_ties_keep_fitted_order() {
        let nn = NearestNeighbors::fit(
            Metric::Euclidean,
            vec![point(&[(2, 1.0)]), point(&[(1, 1.0)]), point(&[(3, 1.0)])],
        );
        let order: Vec<usize> = nn
            .kneighbors(&point(&[(0, 1.0)]), 3)
            .iter()
            .map(|n| n.index)
            .collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn test_cosine_distance() {
        let nn = NearestNeighbors::fit(Metric::Cosine, vec![point(&[(0, 1.0)]), point(&[(1, 1.0)])]);
        let result = nn.kneighbors(&point(&[(0, 1.0)]), 2);
        assert!(result[0].distance.abs() < 1e-12);
        assert!((result[1].distance - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_fit_returns_nothing() {
        let nn = NearestNeighbors::fit(Metric::Euclidean, vec![]);
        assert!(nn.kneighbors(&point(&[(0, 1.0)]), 5).is_empty());
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Euclidean".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!("minkowski".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert_eq!(" cosine ".parse::<Metric>().unwrap(), Metric::Cosine);
        assert!("hamming".parse::<Metric>().is_err());
        assert_eq!(Metric::Cosine.to_string(), "cosine");
    }
}
