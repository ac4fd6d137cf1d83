//! MinHash for Jaccard similarity estimation.
//!
//! MinHash provides locality-sensitive hashing for set similarity by estimating:
//! \(J(A,B) = |A ∩ B| / |A ∪ B|\).
//!
//! Each of the `k` functions in a [`HashFamily`] stands in for a random permutation of the
//! term universe. A token is hashed through the function's rolling word hash, and the
//! signature keeps the minimum value per function. Positions no token reached stay at
//! [`SENTINEL`].

use std::collections::HashMap;

use rayon::prelude::*;

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::hashing::{term_modulus, HashFamily};
use crate::similarity;

/// Signature value meaning "no token observed" (+infinity).
///
/// Real hash values are always below the family modulus, which is below `u64::MAX`.
pub const SENTINEL: u64 = u64::MAX;

/// MinHash signature generator.
#[derive(Debug, Clone)]
pub struct MinHash {
    family: HashFamily,
}

impl MinHash {
    /// Create a generator from an existing hash family.
    pub fn new(family: HashFamily) -> Self {
        Self { family }
    }

    /// Create a generator with `num_hashes` functions modulo `modulus` (deterministic).
    pub fn with_modulus(num_hashes: usize, modulus: u64, seed: u64) -> Result<Self> {
        Ok(Self::new(HashFamily::generate(num_hashes, modulus, seed)?))
    }

    /// Create a generator sized for a term universe of `distinct_terms` terms.
    pub fn for_term_count(num_hashes: usize, distinct_terms: usize, seed: u64) -> Result<Self> {
        Self::with_modulus(num_hashes, term_modulus(distinct_terms)?, seed)
    }

    /// Create a generator sized for the term universe of `corpus`.
    pub fn for_corpus<C: Corpus + ?Sized>(
        corpus: &C,
        num_hashes: usize,
        seed: u64,
    ) -> Result<Self> {
        Self::for_term_count(num_hashes, corpus.term_count(), seed)
    }

    /// Compute a MinHash signature for a sequence of (already filtered) tokens.
    ///
    /// Repeated tokens do not change the result; an empty input yields an all-[`SENTINEL`]
    /// signature.
    pub fn signature<I, S>(&self, tokens: I) -> MinHashSignature
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut mins = vec![SENTINEL; self.family.len()];
        for token in tokens {
            let token = token.as_ref();
            for (slot, f) in mins.iter_mut().zip(self.family.functions()) {
                let h = f.hash_token(token);
                if h < *slot {
                    *slot = h;
                }
            }
        }
        MinHashSignature { values: mins }
    }

    /// Compute signatures for every document in `corpus`, in corpus order.
    ///
    /// Documents are hashed in parallel; row order follows [`Corpus::document_ids`].
    pub fn signature_matrix<C: Corpus + Sync + ?Sized>(
        &self,
        corpus: &C,
    ) -> Result<SignatureMatrix> {
        let ids = corpus.document_ids();
        let rows: Vec<(&str, MinHashSignature)> = ids
            .par_iter()
            .map(|&id| {
                corpus
                    .tokens_of(id)
                    .map(|tokens| (id, self.signature(tokens)))
                    .ok_or_else(|| Error::NotFound(id.to_string()))
            })
            .collect::<Result<_>>()?;

        let mut matrix = SignatureMatrix::new(self.num_hashes())?;
        for (id, sig) in rows {
            matrix.push(id, sig)?;
        }
        tracing::debug!(
            docs = matrix.len(),
            num_hashes = matrix.num_hashes(),
            "built signature matrix"
        );
        Ok(matrix)
    }

    /// Number of hash functions (signature length).
    pub fn num_hashes(&self) -> usize {
        self.family.len()
    }

    /// The underlying hash family.
    pub fn family(&self) -> &HashFamily {
        &self.family
    }
}

/// A MinHash signature (fingerprint) of a set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinHashSignature {
    /// The min-hash values for each hash function.
    pub values: Vec<u64>,
}

impl MinHashSignature {
    /// Estimate Jaccard similarity from two signatures.
    ///
    /// See [`similarity::approximate_jaccard`].
    pub fn jaccard(&self, other: &Self) -> Result<f64> {
        similarity::approximate_jaccard(self, other)
    }

    /// Signature length (`k`).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-length signature.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True if no token contributed, i.e. every position is [`SENTINEL`].
    pub fn is_empty_set(&self) -> bool {
        self.values.iter().all(|&v| v == SENTINEL)
    }
}

/// Per-document signatures: rows are documents, columns are hash functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMatrix {
    num_hashes: usize,
    rows: Vec<(String, MinHashSignature)>,
    positions: HashMap<String, usize>,
}

impl SignatureMatrix {
    /// Create an empty matrix whose rows will all have length `num_hashes`.
    pub fn new(num_hashes: usize) -> Result<Self> {
        if num_hashes == 0 {
            return Err(Error::invalid("signature length must be >= 1"));
        }
        Ok(Self {
            num_hashes,
            rows: Vec::new(),
            positions: HashMap::new(),
        })
    }

    /// Append a row; returns its row index.
    ///
    /// Fails on a length mismatch or a repeated document id.
    pub fn push(
        &mut self,
        doc_id: impl Into<String>,
        signature: MinHashSignature,
    ) -> Result<usize> {
        let doc_id = doc_id.into();
        if signature.len() != self.num_hashes {
            return Err(Error::DimensionMismatch {
                expected: self.num_hashes,
                got: signature.len(),
            });
        }
        if self.positions.contains_key(&doc_id) {
            return Err(Error::invalid(format!("duplicate document id: {doc_id}")));
        }
        let row = self.rows.len();
        self.positions.insert(doc_id.clone(), row);
        self.rows.push((doc_id, signature));
        Ok(row)
    }

    /// Signature length shared by every row.
    pub fn num_hashes(&self) -> usize {
        self.num_hashes
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if no documents.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row index of `doc_id`.
    pub fn position(&self, doc_id: &str) -> Option<usize> {
        self.positions.get(doc_id).copied()
    }

    /// Signature of `doc_id`.
    pub fn get(&self, doc_id: &str) -> Option<&MinHashSignature> {
        self.position(doc_id).map(|row| &self.rows[row].1)
    }

    /// Row at index `row`.
    pub fn row(&self, row: usize) -> Option<(&str, &MinHashSignature)> {
        self.rows.get(row).map(|(id, sig)| (id.as_str(), sig))
    }

    /// Document id at row `row`.
    pub fn doc_id(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(|(id, _)| id.as_str())
    }

    /// Rows in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MinHashSignature)> {
        self.rows.iter().map(|(id, sig)| (id.as_str(), sig))
    }
}
