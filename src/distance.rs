//! Distance metrics and the pairwise distance matrix.
//!
//! ## Public invariants
//!
//! - **Exact symmetry**: only the upper triangle is computed; `D[j][i]` is a
//!   copy of `D[i][j]`, and `D[i][i] = 0`.
//! - **No silent shape coercion**: vectors of different lengths are an error.
//! - **Same result with or without `parallel`**: rows are computed
//!   independently and written back in index order.

use crate::error::{Error, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// A distance between two embedding vectors.
///
/// Implementations must return a finite value `>= 0` and must be symmetric.
/// Any `Fn(&[f32], &[f32]) -> f64 + Sync` is a metric.
pub trait DistanceMetric: Sync {
    /// Distance between `a` and `b` (same length).
    fn distance(&self, a: &[f32], b: &[f32]) -> f64;
}

impl<F> DistanceMetric for F
where
    F: Fn(&[f32], &[f32]) -> f64 + Sync,
{
    fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        self(a, b)
    }
}

/// Built-in metrics, selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    /// `1 - cos(a, b)`, in `[0, 2]`.
    #[default]
    Cosine,
    /// L2 distance.
    Euclidean,
    /// L1 distance.
    Manhattan,
}

impl Metric {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
            Metric::Manhattan => "manhattan",
        }
    }
}

impl DistanceMetric for Metric {
    fn distance(&self, a: &[f32], b: &[f32]) -> f64 {
        match self {
            Metric::Cosine => cosine_distance(a, b),
            Metric::Euclidean => euclidean_distance(a, b),
            Metric::Manhattan => manhattan_distance(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Metric::Cosine),
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            "manhattan" | "cityblock" | "l1" => Ok(Metric::Manhattan),
            other => Err(Error::config(
                "metric",
                format!("unsupported distance metric '{other}'"),
            )),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

/// Cosine distance `1 - a·b / (|a| |b|)`.
///
/// A zero vector has no direction; it is at distance 1 from every other vector
/// (and 0 from an identical one).
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return if a == b { 0.0 } else { 1.0 };
    }
    (1.0 - dot / (na.sqrt() * nb.sqrt())).clamp(0.0, 2.0)
}

/// Euclidean (L2) distance.
pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = f64::from(x) - f64::from(y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Manhattan (L1) distance.
pub fn manhattan_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (f64::from(x) - f64::from(y)).abs())
        .sum()
}

/// Full symmetric `n x n` distance matrix.
///
/// # Errors
///
/// [`Error::DimensionMismatch`] when the vectors differ in length.
pub fn pairwise_distances<M>(vectors: &[&[f32]], metric: &M) -> Result<Array2<f64>>
where
    M: DistanceMetric + ?Sized,
{
    let n = vectors.len();
    if let Some(first) = vectors.first() {
        let dim = first.len();
        if let Some(v) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: v.len(),
            });
        }
    }

    let upper_row = |i: usize| -> Vec<f64> {
        ((i + 1)..n)
            .map(|j| metric.distance(vectors[i], vectors[j]))
            .collect()
    };

    #[cfg(feature = "parallel")]
    let rows: Vec<Vec<f64>> = (0..n).into_par_iter().map(upper_row).collect();

    #[cfg(not(feature = "parallel"))]
    let rows: Vec<Vec<f64>> = (0..n).map(upper_row).collect();

    let mut matrix = Array2::<f64>::zeros((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (offset, d) in row.into_iter().enumerate() {
            let j = i + 1 + offset;
            matrix[[i, j]] = d;
            matrix[[j, i]] = d;
        }
    }
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_cosine_basic() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-12);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_euclidean_and_manhattan() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert!((manhattan_distance(&[0.0, 0.0], &[3.0, -4.0]) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_metric_names() {
        assert_eq!("Cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("cityblock".parse::<Metric>().unwrap(), Metric::Manhattan);
        assert!(matches!(
            "hamming".parse::<Metric>(),
            Err(Error::Configuration { name: "metric", .. })
        ));
    }

    #[test]
    fn test_closure_metric() {
        let vectors: Vec<&[f32]> = vec![&[0.0], &[2.0], &[5.0]];
        let abs_diff = |a: &[f32], b: &[f32]| f64::from((a[0] - b[0]).abs());
        let d = pairwise_distances(&vectors, &abs_diff).unwrap();
        assert_eq!(d[[0, 2]], 5.0);
        assert_eq!(d[[2, 1]], 3.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let vectors: Vec<&[f32]> = vec![&[0.0, 1.0], &[1.0]];
        let err = pairwise_distances(&vectors, &Metric::Cosine).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                found: 1
            }
        );
    }

    proptest! {
        #[test]
        fn prop_matrix_symmetric_zero_diagonal(
            points in proptest::collection::vec(
                proptest::collection::vec(-10.0f32..10.0, 4),
                1..12,
            ),
            metric in prop_oneof![
                Just(Metric::Cosine),
                Just(Metric::Euclidean),
                Just(Metric::Manhattan),
            ],
        ) {
            let refs: Vec<&[f32]> = points.iter().map(|p| p.as_slice()).collect();
            let d = pairwise_distances(&refs, &metric).unwrap();
            for i in 0..refs.len() {
                prop_assert_eq!(d[[i, i]], 0.0);
                for j in 0..refs.len() {
                    prop_assert_eq!(d[[i, j]], d[[j, i]]);
                    prop_assert!(d[[i, j]] >= 0.0);
                }
            }
        }
    }
}
