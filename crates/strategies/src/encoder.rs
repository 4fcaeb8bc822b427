//! One-hot feature encoding over categorical species attributes.
//!
//! The vector space is fitted from the current candidate batch only:
//! one column block per attribute (group, family, habitat, observation type,
//! in that order), values inside a block sorted lexicographically. Nothing
//! is persisted between requests.

use crate::types::{Candidate, MISSING_VALUE};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Number of categorical attributes encoded per candidate
pub const FEATURE_COLUMNS: usize = 4;

/// (group, family, habitat, observation_type), with missing values as `"None"`
pub type FeatureTuple<'a> = [&'a str; FEATURE_COLUMNS];

/// Categorical attributes of a candidate, in encoding column order
pub fn feature_tuple(candidate: &Candidate) -> FeatureTuple<'_> {
    [
        candidate.group().unwrap_or(MISSING_VALUE),
        candidate.family().unwrap_or(MISSING_VALUE),
        candidate.habitat().unwrap_or(MISSING_VALUE),
        candidate.observation_type().unwrap_or(MISSING_VALUE),
    ]
}

/// Deterministic one-hot encoder fitted on one candidate batch
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder {
    /// Per column: value -> absolute position in the output vector
    columns: [BTreeMap<String, usize>; FEATURE_COLUMNS],
    dimension: usize,
}

impl FeatureEncoder {
    /// Fit the vocabulary on a batch of candidates
    pub fn fit<'a, I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let tuples: Vec<FeatureTuple<'a>> = candidates.into_iter().map(feature_tuple).collect();
        Self::fit_tuples(&tuples)
    }

    /// Fit the vocabulary on raw feature tuples
    pub fn fit_tuples(tuples: &[FeatureTuple<'_>]) -> Self {
        let mut distinct: [BTreeSet<&str>; FEATURE_COLUMNS] = Default::default();
        for tuple in tuples {
            for (column, value) in tuple.iter().enumerate() {
                distinct[column].insert(*value);
            }
        }

        let mut encoder = FeatureEncoder::default();
        let mut offset = 0;
        for (column, values) in distinct.into_iter().enumerate() {
            for value in values {
                encoder.columns[column].insert(value.to_string(), offset);
                offset += 1;
            }
        }
        encoder.dimension = offset;
        encoder
    }

    /// Length of every encoded vector
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Encode one tuple. Values outside the fitted vocabulary leave their
    /// column all zeros.
    pub fn encode(&self, tuple: &FeatureTuple<'_>) -> Vec<f64> {
        let mut vector = vec![0.0; self.dimension];
        for (column, value) in tuple.iter().enumerate() {
            if let Some(&position) = self.columns[column].get(*value) {
                vector[position] = 1.0;
            }
        }
        vector
    }

    pub fn encode_candidate(&self, candidate: &Candidate) -> Vec<f64> {
        self.encode(&feature_tuple(candidate))
    }

    /// Encode a batch in parallel. Output order matches input order.
    pub fn encode_all(&self, candidates: &[&Candidate]) -> Vec<Vec<f64>> {
        candidates
            .par_iter()
            .map(|candidate| self.encode_candidate(candidate))
            .collect()
    }
}

/// Component-wise mean of equally sized vectors; `None` for an empty slice
pub fn mean_vector(vectors: &[Vec<f64>]) -> Option<Vec<f64>> {
    let first = vectors.first()?;
    let mut mean = vec![0.0; first.len()];
    for vector in vectors {
        for (acc, value) in mean.iter_mut().zip(vector) {
            *acc += value;
        }
    }
    let n = vectors.len() as f64;
    mean.iter_mut().for_each(|v| *v /= n);
    Some(mean)
}

/// Cosine distance `1 - a.b / (|a||b|)`; `1.0` when either vector is zero
pub fn cosine_distance(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_candidates() -> Vec<Candidate> {
        vec![
            Candidate::new("1")
                .with_group("Aves")
                .with_family("Fringillidae")
                .with_habitat("forest"),
            Candidate::new("2").with_group("Aves").with_family("Corvidae"),
            Candidate::new("3")
                .with_group("Mammalia")
                .with_family("Felidae")
                .with_observation_type("photo"),
        ]
    }

    #[test]
    fn test_fit_builds_sorted_vocabulary() {
        let candidates = create_test_candidates();
        let encoder = FeatureEncoder::fit(&candidates);

        // group: Aves, Mammalia | family: Corvidae, Felidae, Fringillidae
        // habitat: None, forest | observation_type: None, photo
        assert_eq!(encoder.dimension(), 9);
        assert_eq!(
            encoder.encode_candidate(&candidates[1]),
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn test_unknown_values_encode_to_zero() {
        let candidates = create_test_candidates();
        let encoder = FeatureEncoder::fit(&candidates);

        let vector = encoder.encode(&["Reptilia", "Felidae", "desert", "None"]);
        let ones: Vec<usize> = vector
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == 1.0)
            .map(|(i, _)| i)
            .collect();
        // Only Felidae and the observation_type "None" are known
        assert_eq!(ones, vec![3, 7]);
    }

    #[test]
    fn test_encoding_is_deterministic_across_batch_order() {
        let mut candidates = create_test_candidates();
        let first = FeatureEncoder::fit(&candidates).encode_candidate(&candidates[0]);
        candidates.reverse();
        let second = FeatureEncoder::fit(&candidates).encode_candidate(&candidates[2]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_encode_all_preserves_order() {
        let candidates = create_test_candidates();
        let encoder = FeatureEncoder::fit(&candidates);
        let refs: Vec<&Candidate> = candidates.iter().collect();

        let vectors = encoder.encode_all(&refs);
        assert_eq!(vectors.len(), 3);
        for (candidate, vector) in candidates.iter().zip(&vectors) {
            assert_eq!(&encoder.encode_candidate(candidate), vector);
        }
    }

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_mean_vector() {
        assert_eq!(
            mean_vector(&[vec![1.0, 0.0], vec![0.0, 1.0]]),
            Some(vec![0.5, 0.5])
        );
        assert_eq!(mean_vector(&[]), None);
    }
}
