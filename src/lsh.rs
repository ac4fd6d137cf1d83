//! Banding LSH over a MinHash signature matrix.
//!
//! The `k` signature columns are split into `num_bands` contiguous bands of
//! `r = k / num_bands` rows. Each band of each document is folded into one integer by an
//! affine accumulator modulo a table prime, and the document is filed under
//! `(band, hash)`. Documents that agree on every column of some band always share that
//! bucket, so they are always each other's candidates. Unrelated documents may also
//! collide; callers re-check candidates with exact Jaccard.
//!
//! The bucket table is stored sharded by band: shard `b` maps a band hash to the rows
//! filed under [`BucketKey`] `{ band: b, hash }`.

use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::hashing::{table_modulus, HashFamily, HashFunction};
use crate::minhash::{MinHashSignature, SignatureMatrix};
use crate::similarity::approximate_jaccard;

/// Address of a bucket: band index plus the band's combined hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketKey {
    /// Band index in `0..num_bands`.
    pub band: usize,
    /// Combined hash of the band's values, below the table prime.
    pub hash: u64,
}

/// LSH index using MinHash banding (near-duplicate detection).
///
/// Built once from a [`SignatureMatrix`] and read-only afterwards.
#[derive(Debug, Clone)]
pub struct LshIndex {
    matrix: SignatureMatrix,
    num_bands: usize,
    rows_per_band: usize,
    band_fn: HashFunction,
    buckets: Vec<HashMap<u64, Vec<usize>>>,
}

impl LshIndex {
    /// Build the bucket table for `matrix` with `num_bands` bands.
    ///
    /// `num_bands` must evenly divide the signature length. The band hash function is drawn
    /// modulo `next_prime(5·n)` from an RNG seeded with `seed`, so the same matrix, band
    /// count and seed always give the same table.
    pub fn build(matrix: SignatureMatrix, num_bands: usize, seed: u64) -> Result<Self> {
        let k = matrix.num_hashes();
        if num_bands == 0 {
            return Err(Error::invalid("num_bands must be >= 1"));
        }
        if k % num_bands != 0 {
            return Err(Error::invalid(format!(
                "num_bands ({num_bands}) must evenly divide the signature length ({k})"
            )));
        }
        let rows_per_band = k / num_bands;

        let table_prime = table_modulus(matrix.len())?;
        let band_fn = HashFamily::generate(1, table_prime, seed)?.functions()[0];

        // Bands are independent shards.
        let buckets: Vec<HashMap<u64, Vec<usize>>> = (0..num_bands)
            .into_par_iter()
            .map(|band| {
                let mut shard: HashMap<u64, Vec<usize>> = HashMap::new();
                for (row, (_, sig)) in matrix.iter().enumerate() {
                    let hash = fold_band(&band_fn, band_slice(sig, band, rows_per_band));
                    shard.entry(hash).or_default().push(row);
                }
                shard
            })
            .collect();

        tracing::debug!(
            docs = matrix.len(),
            num_bands,
            rows_per_band,
            table_prime,
            buckets = buckets.iter().map(HashMap::len).sum::<usize>(),
            "built lsh index"
        );

        Ok(Self {
            matrix,
            num_bands,
            rows_per_band,
            band_fn,
            buckets,
        })
    }

    /// Ids of every document sharing at least one bucket with `doc_id`, in row order.
    ///
    /// The result includes `doc_id` itself; filter it out if only others are wanted.
    pub fn near_duplicates_of(&self, doc_id: &str) -> Result<Vec<&str>> {
        let sig = self
            .matrix
            .get(doc_id)
            .ok_or_else(|| Error::NotFound(doc_id.to_string()))?;
        let rows = self.candidate_rows(sig);
        tracing::trace!(doc_id, candidates = rows.len(), "lsh query");
        Ok(rows.into_iter().filter_map(|r| self.matrix.doc_id(r)).collect())
    }

    /// Like [`Self::near_duplicates_of`], with estimated Jaccard, most similar first.
    pub fn near_duplicates_with_similarity(&self, doc_id: &str) -> Result<Vec<(&str, f64)>> {
        let sig = self
            .matrix
            .get(doc_id)
            .ok_or_else(|| Error::NotFound(doc_id.to_string()))?;
        let mut results = Vec::new();
        for row in self.candidate_rows(sig) {
            if let Some((id, other)) = self.matrix.row(row) {
                results.push((row, id, approximate_jaccard(sig, other)?));
            }
        }
        results.sort_by(|a, b| b.2.total_cmp(&a.2).then_with(|| a.0.cmp(&b.0)));
        Ok(results.into_iter().map(|(_, id, s)| (id, s)).collect())
    }

    /// Candidate rows for an arbitrary signature of the indexed length, sorted.
    pub fn query(&self, signature: &MinHashSignature) -> Result<Vec<usize>> {
        self.check_len(signature)?;
        Ok(self.candidate_rows(signature))
    }

    /// All unordered row pairs `(i, j)`, `i < j`, that share at least one bucket. Sorted.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs: HashSet<(usize, usize)> = HashSet::new();
        for shard in &self.buckets {
            for rows in shard.values() {
                for (i, &a) in rows.iter().enumerate() {
                    for &b in &rows[i + 1..] {
                        pairs.insert((a.min(b), a.max(b)));
                    }
                }
            }
        }
        let mut v: Vec<(usize, usize)> = pairs.into_iter().collect();
        v.sort_unstable();
        v
    }

    /// Combined hash of `band` of `signature`.
    pub fn band_hash(&self, signature: &MinHashSignature, band: usize) -> Result<u64> {
        self.check_len(signature)?;
        if band >= self.num_bands {
            return Err(Error::invalid(format!(
                "band {band} out of range (num_bands = {})",
                self.num_bands
            )));
        }
        Ok(fold_band(
            &self.band_fn,
            band_slice(signature, band, self.rows_per_band),
        ))
    }

    /// Bucket keys of `signature`, one per band.
    pub fn bucket_keys(&self, signature: &MinHashSignature) -> Result<Vec<BucketKey>> {
        self.check_len(signature)?;
        Ok(self.keys_of(signature).collect())
    }

    /// Rows filed under `key`, in row order.
    pub fn bucket(&self, key: BucketKey) -> Option<&[usize]> {
        self.buckets
            .get(key.band)?
            .get(&key.hash)
            .map(Vec::as_slice)
    }

    /// The bucket table, one shard per band.
    pub fn bucket_table(&self) -> &[HashMap<u64, Vec<usize>>] {
        &self.buckets
    }

    /// Total number of non-empty buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.iter().map(HashMap::len).sum()
    }

    /// The indexed signatures.
    pub fn matrix(&self) -> &SignatureMatrix {
        &self.matrix
    }

    /// Number of bands.
    pub fn num_bands(&self) -> usize {
        self.num_bands
    }

    /// Signature columns per band.
    pub fn rows_per_band(&self) -> usize {
        self.rows_per_band
    }

    /// Prime modulus of the band hash.
    pub fn table_prime(&self) -> u64 {
        self.band_fn.modulus()
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    /// True if no documents are indexed.
    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    fn check_len(&self, signature: &MinHashSignature) -> Result<()> {
        if signature.len() != self.matrix.num_hashes() {
            return Err(Error::DimensionMismatch {
                expected: self.matrix.num_hashes(),
                got: signature.len(),
            });
        }
        Ok(())
    }

    fn keys_of<'a>(
        &'a self,
        signature: &'a MinHashSignature,
    ) -> impl Iterator<Item = BucketKey> + 'a {
        signature
            .values
            .chunks_exact(self.rows_per_band)
            .enumerate()
            .map(move |(band, values)| BucketKey {
                band,
                hash: fold_band(&self.band_fn, values),
            })
    }

    fn candidate_rows(&self, signature: &MinHashSignature) -> Vec<usize> {
        let mut candidates: HashSet<usize> = HashSet::new();
        for key in self.keys_of(signature) {
            if let Some(rows) = self.bucket(key) {
                candidates.extend(rows.iter().copied());
            }
        }
        let mut v: Vec<usize> = candidates.into_iter().collect();
        v.sort_unstable();
        v
    }
}

fn band_slice(signature: &MinHashSignature, band: usize, rows_per_band: usize) -> &[u64] {
    let start = band * rows_per_band;
    &signature.values[start..start + rows_per_band]
}

/// `acc = 1; acc = (acc + a·v + b) mod p` over the band's values.
fn fold_band(f: &HashFunction, values: &[u64]) -> u64 {
    values.iter().fold(1, |acc, &v| f.accumulate(acc, v))
}
