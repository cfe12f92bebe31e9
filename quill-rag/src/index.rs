//! Brute-force flat vector index.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

/// A flat, add-only vector index searched by exhaustive scan.
///
/// Vectors are stored in insertion order; position `i` in the index
/// corresponds to entry `i` in the engine's chunk list, and the engine keeps
/// the two aligned. There is no per-vector deletion — removing anything
/// means rebuilding a fresh index from the retained vectors, which is the
/// honest contract of a flat structure.
///
/// Distances are squared L2. The similarity transform `1 / (1 + distance)`
/// applied by the engine operates on this raw value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Create an empty index for vectors of the given dimensionality.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions, vectors: Vec::new() }
    }

    /// The configured vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether the index holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append vectors to the index.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Index`] if any vector's dimensionality
    /// differs from the configured one; nothing is appended in that case.
    pub fn add(&mut self, vectors: Vec<Vec<f32>>) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimensions) {
            return Err(RetrievalError::Index {
                operation: "add".into(),
                message: format!(
                    "expected {}-dimensional vectors, got {}",
                    self.dimensions,
                    bad.len()
                ),
            });
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Return the `k` nearest stored vectors as `(position, distance)`
    /// pairs, sorted by ascending squared-L2 distance.
    ///
    /// Returns fewer than `k` pairs when the index holds fewer vectors, and
    /// an empty `Vec` for an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RetrievalError::Index`] if the query dimensionality does
    /// not match the index.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimensions {
            return Err(RetrievalError::Index {
                operation: "search".into(),
                message: format!(
                    "expected a {}-dimensional query, got {}",
                    self.dimensions,
                    query.len()
                ),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| (position, squared_l2(query, vector)))
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

/// Squared Euclidean distance between two equal-length vectors.
fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_index_search_returns_nothing() {
        let index = FlatIndex::new(3);
        assert!(index.search(&[0.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn search_orders_by_ascending_distance() {
        let mut index = FlatIndex::new(2);
        index
            .add(vec![vec![0.0, 3.0], vec![0.0, 1.0], vec![0.0, 2.0]])
            .unwrap();

        let results = index.search(&[0.0, 0.0], 3).unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].0, 1); // distance 1
        assert_eq!(results[1].0, 2); // distance 4
        assert_eq!(results[2].0, 0); // distance 9
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert!((results[1].1 - 4.0).abs() < 1e-6);
    }

    #[test]
    fn search_returns_at_most_k() {
        let mut index = FlatIndex::new(1);
        index.add(vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]).unwrap();
        assert_eq!(index.search(&[0.0], 2).unwrap().len(), 2);
        assert_eq!(index.search(&[0.0], 10).unwrap().len(), 4);
    }

    #[test]
    fn add_rejects_mismatched_dimensions() {
        let mut index = FlatIndex::new(3);
        let err = index.add(vec![vec![1.0, 2.0]]).unwrap_err();
        assert!(err.to_string().contains("add"));
        assert!(index.is_empty());
    }

    #[test]
    fn search_rejects_mismatched_query() {
        let mut index = FlatIndex::new(2);
        index.add(vec![vec![0.0, 0.0]]).unwrap();
        assert!(index.search(&[1.0], 1).is_err());
    }
}
