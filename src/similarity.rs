//! Exact and estimated Jaccard similarity.
//!
//! The estimate is the fraction of signature positions on which two MinHash signatures
//! agree. It is unbiased for the exact Jaccard coefficient, with variance shrinking as
//! `O(1/k)`; callers who need precision re-check candidates with [`exact_jaccard`].

use std::collections::HashSet;
use std::hash::Hash;

use rayon::prelude::*;

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::minhash::{MinHashSignature, SignatureMatrix};

/// Fraction of positions where `a` and `b` hold the same value.
///
/// Fails with [`Error::DimensionMismatch`] if the lengths differ, and with
/// [`Error::InvalidParameter`] for zero-length signatures.
pub fn approximate_jaccard(a: &MinHashSignature, b: &MinHashSignature) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            got: b.len(),
        });
    }
    if a.is_empty() {
        return Err(Error::invalid("cannot compare zero-length signatures"));
    }
    let matches = a
        .values
        .iter()
        .zip(b.values.iter())
        .filter(|(x, y)| x == y)
        .count();
    Ok(matches as f64 / a.len() as f64)
}

/// `|A ∩ B| / |A ∪ B|`.
///
/// Two empty sets give [`Error::UndefinedSimilarity`]; one empty set gives `0.0`.
pub fn exact_jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> Result<f64> {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|x| large.contains(*x)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return Err(Error::UndefinedSimilarity);
    }
    Ok(intersection as f64 / union as f64)
}

/// Collapse a token multiset into the set that [`exact_jaccard`] compares.
pub fn token_set<S: AsRef<str>>(tokens: &[S]) -> HashSet<&str> {
    tokens.iter().map(AsRef::as_ref).collect()
}

/// How closely MinHash estimates track exact Jaccard over every document pair.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    /// Tolerance used for `exceeding`.
    pub epsilon: f64,
    /// Number of unordered document pairs compared.
    pub comparisons: usize,
    /// Pairs where `|approx - exact| > epsilon`.
    pub exceeding: usize,
    /// Pairs skipped because both documents are empty.
    pub undefined: usize,
    /// Mean of `|approx - exact|` over the defined pairs (0 if there are none).
    pub mean_absolute_error: f64,
}

#[derive(Default)]
struct Tally {
    comparisons: usize,
    exceeding: usize,
    undefined: usize,
    abs_error_sum: f64,
}

impl Tally {
    fn merge(mut self, other: Tally) -> Tally {
        self.comparisons += other.comparisons;
        self.exceeding += other.exceeding;
        self.undefined += other.undefined;
        self.abs_error_sum += other.abs_error_sum;
        self
    }
}

impl AccuracyReport {
    /// Compare estimated and exact Jaccard for every pair of rows in `matrix`.
    ///
    /// Token sets come from `corpus`; every matrix row must be present there.
    pub fn evaluate<C: Corpus + Sync + ?Sized>(
        matrix: &SignatureMatrix,
        corpus: &C,
        epsilon: f64,
    ) -> Result<Self> {
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(Error::invalid(format!(
                "epsilon must be finite and >= 0, got {epsilon}"
            )));
        }

        let sets: Vec<HashSet<&str>> = matrix
            .iter()
            .map(|(id, _)| {
                corpus
                    .tokens_of(id)
                    .map(token_set)
                    .ok_or_else(|| Error::NotFound(id.to_string()))
            })
            .collect::<Result<_>>()?;
        let sigs: Vec<&MinHashSignature> = matrix.iter().map(|(_, sig)| sig).collect();

        let tally = (0..sigs.len())
            .into_par_iter()
            .map(|i| -> Result<Tally> {
                let mut t = Tally::default();
                for j in (i + 1)..sigs.len() {
                    t.comparisons += 1;
                    let exact = match exact_jaccard(&sets[i], &sets[j]) {
                        Ok(v) => v,
                        Err(Error::UndefinedSimilarity) => {
                            t.undefined += 1;
                            continue;
                        }
                        Err(e) => return Err(e),
                    };
                    let err = (approximate_jaccard(sigs[i], sigs[j])? - exact).abs();
                    t.abs_error_sum += err;
                    if err > epsilon {
                        t.exceeding += 1;
                    }
                }
                Ok(t)
            })
            .try_reduce(Tally::default, |a, b| Ok(a.merge(b)))?;

        let defined = tally.comparisons - tally.undefined;
        let mean_absolute_error = if defined == 0 {
            0.0
        } else {
            tally.abs_error_sum / defined as f64
        };
        tracing::debug!(
            comparisons = tally.comparisons,
            exceeding = tally.exceeding,
            mean_absolute_error,
            "evaluated minhash accuracy"
        );
        Ok(Self {
            epsilon,
            comparisons: tally.comparisons,
            exceeding: tally.exceeding,
            undefined: tally.undefined,
            mean_absolute_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set<'a>(words: &[&'a str]) -> HashSet<&'a str> {
        words.iter().copied().collect()
    }

    fn sig(values: &[u64]) -> MinHashSignature {
        MinHashSignature {
            values: values.to_vec(),
        }
    }

    #[test]
    fn exact_jaccard_worked_example() {
        let a = set(&["quick", "brown", "fox"]);
        let b = set(&["quick", "brown", "fox", "jumps"]);
        assert_eq!(exact_jaccard(&a, &b).unwrap(), 0.75);
        assert_eq!(exact_jaccard(&b, &a).unwrap(), 0.75);
    }

    #[test]
    fn exact_jaccard_edges() {
        let empty: HashSet<&str> = HashSet::new();
        let a = set(&["x", "y"]);
        assert!(matches!(
            exact_jaccard(&empty, &empty),
            Err(Error::UndefinedSimilarity)
        ));
        assert_eq!(exact_jaccard(&a, &empty).unwrap(), 0.0);
        assert_eq!(exact_jaccard(&a, &a).unwrap(), 1.0);
        assert_eq!(exact_jaccard(&a, &set(&["z"])).unwrap(), 0.0);
    }

    #[test]
    fn approximate_jaccard_counts_matches() {
        let a = sig(&[1, 2, 3, 4]);
        let b = sig(&[1, 2, 0, 0]);
        assert_eq!(approximate_jaccard(&a, &b).unwrap(), 0.5);
        assert_eq!(approximate_jaccard(&a, &a).unwrap(), 1.0);
        assert_eq!(a.jaccard(&b).unwrap(), 0.5);
    }

    #[test]
    fn approximate_jaccard_rejects_bad_lengths() {
        assert!(matches!(
            approximate_jaccard(&sig(&[1, 2]), &sig(&[1])),
            Err(Error::DimensionMismatch {
                expected: 2,
                got: 1
            })
        ));
        assert!(matches!(
            approximate_jaccard(&sig(&[]), &sig(&[])),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn token_set_collapses_duplicates() {
        let tokens = vec!["a".to_string(), "b".into(), "a".into()];
        assert_eq!(token_set(&tokens).len(), 2);
    }
}
