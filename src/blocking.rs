//! Near-duplicate blocking over a corpus: MinHash + LSH + exact re-check.
//!
//! This module ties the pieces together for a whole corpus: it sizes the term hash
//! family from the corpus vocabulary, builds the signature matrix and LSH index, and
//! re-verifies LSH candidates with exact Jaccard so that bucket collisions below the
//! similarity threshold are reported as false positives rather than duplicates.
//!
//! # Example
//!
//! ```rust
//! use nearsketch::blocking::{BlockingConfig, NearDuplicateFinder};
//! use nearsketch::corpus::InMemoryCorpus;
//! use nearsketch::text::WordTokenizer;
//!
//! let tok = WordTokenizer::default();
//! let mut corpus = InMemoryCorpus::new();
//! corpus.insert_text("1", "the quick brown fox jumps over the lazy dog", &tok).unwrap();
//! corpus.insert_text("2", "The quick brown fox jumps over the lazy dog.", &tok).unwrap();
//! corpus.insert_text("3", "stock markets rallied on friday", &tok).unwrap();
//!
//! let finder = NearDuplicateFinder::build(corpus, BlockingConfig::default()).unwrap();
//! let report = finder.near_duplicates("1").unwrap();
//! assert_eq!(report.duplicates[0].0, "2");
//! ```

use crate::corpus::Corpus;
use crate::error::{Error, Result};
use crate::lsh::LshIndex;
use crate::minhash::{MinHash, MinHashSignature};
use crate::similarity::{exact_jaccard, token_set, AccuracyReport};

/// Configuration for MinHash-based near-duplicate blocking.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockingConfig {
    /// Signature length `k` (number of hash functions).
    pub num_permutations: usize,
    /// Number of LSH bands; must divide `num_permutations`.
    pub num_bands: usize,
    /// Exact Jaccard above which a candidate counts as a near-duplicate.
    pub similarity_threshold: f64,
    /// Seed for both the term hash family and the band hash.
    pub seed: u64,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            num_permutations: 100,
            num_bands: 20,
            similarity_threshold: 0.5,
            seed: 42,
        }
    }
}

impl BlockingConfig {
    /// Create config optimized for high recall (more candidates).
    pub fn high_recall() -> Self {
        Self {
            num_bands: 50,
            ..Default::default()
        }
    }

    /// Create config optimized for high precision (fewer, better candidates).
    pub fn high_precision() -> Self {
        Self {
            num_bands: 10,
            ..Default::default()
        }
    }

    /// Signature columns per band (`k / b`).
    pub fn rows_per_band(&self) -> usize {
        if self.num_bands == 0 {
            0
        } else {
            self.num_permutations / self.num_bands
        }
    }

    /// Check that the parameters describe a buildable index.
    pub fn validate(&self) -> Result<()> {
        if self.num_permutations == 0 {
            return Err(Error::invalid("num_permutations must be >= 1"));
        }
        if self.num_bands == 0 || self.num_permutations % self.num_bands != 0 {
            return Err(Error::invalid(format!(
                "num_bands ({}) must evenly divide num_permutations ({})",
                self.num_bands, self.num_permutations
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::invalid(format!(
                "similarity_threshold must be in [0, 1], got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }

    /// Estimate the probability that two items with given Jaccard similarity
    /// will be placed in the same bucket (i.e., become candidates).
    ///
    /// \(P(\text{candidate}) = 1 - (1 - s^r)^b\)
    /// where \(s\) is similarity, \(r\) is rows per band, and \(b\) is `num_bands`.
    pub fn candidate_probability(&self, jaccard_similarity: f64) -> f64 {
        let s = jaccard_similarity;
        let r = self.rows_per_band() as f64;
        let b = self.num_bands as f64;
        1.0 - (1.0 - s.powf(r)).powf(b)
    }
}

/// Outcome of a near-duplicate lookup for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct NearDuplicateReport {
    /// The queried document.
    pub doc_id: String,
    /// Candidates above the threshold with their exact Jaccard, most similar first.
    pub duplicates: Vec<(String, f64)>,
    /// Candidates that shared a bucket but fell at or below the threshold.
    pub false_positives: usize,
}

/// MinHash + banding LSH over a corpus, with exact re-verification.
#[derive(Debug)]
pub struct NearDuplicateFinder<C> {
    config: BlockingConfig,
    corpus: C,
    minhash: MinHash,
    index: LshIndex,
}

impl<C: Corpus + Sync> NearDuplicateFinder<C> {
    /// Hash every document of `corpus` and build the index.
    pub fn build(corpus: C, config: BlockingConfig) -> Result<Self> {
        config.validate()?;
        let minhash = MinHash::for_corpus(&corpus, config.num_permutations, config.seed)?;
        let matrix = minhash.signature_matrix(&corpus)?;
        let index = LshIndex::build(matrix, config.num_bands, config.seed)?;
        tracing::debug!(
            docs = index.len(),
            num_permutations = config.num_permutations,
            num_bands = config.num_bands,
            "built near-duplicate finder"
        );
        Ok(Self {
            config,
            corpus,
            minhash,
            index,
        })
    }

    /// Near-duplicates of `doc_id` (excluding itself), verified by exact Jaccard.
    pub fn near_duplicates(&self, doc_id: &str) -> Result<NearDuplicateReport> {
        let own = self.token_set_of(doc_id)?;
        let mut duplicates = Vec::new();
        let mut false_positives = 0;

        for candidate in self.index.near_duplicates_of(doc_id)? {
            if candidate == doc_id {
                continue;
            }
            let other = self.token_set_of(candidate)?;
            match exact_jaccard(&own, &other) {
                Ok(sim) if sim > self.config.similarity_threshold => {
                    duplicates.push((candidate.to_string(), sim));
                }
                Ok(_) | Err(Error::UndefinedSimilarity) => false_positives += 1,
                Err(e) => return Err(e),
            }
        }

        duplicates.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        tracing::trace!(
            doc_id,
            duplicates = duplicates.len(),
            false_positives,
            "near-duplicate lookup"
        );
        Ok(NearDuplicateReport {
            doc_id: doc_id.to_string(),
            duplicates,
            false_positives,
        })
    }

    /// Indexed documents that collide with an external token sequence.
    pub fn query_tokens<I, S>(&self, tokens: I) -> Result<Vec<&str>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sig = self.minhash.signature(tokens);
        let matrix = self.index.matrix();
        Ok(self
            .index
            .query(&sig)?
            .into_iter()
            .filter_map(|row| matrix.doc_id(row))
            .collect())
    }

    /// Candidate id pairs whose estimated similarity is at least the threshold.
    pub fn candidate_pairs_with_similarity(&self) -> Result<Vec<(&str, &str, f64)>> {
        let matrix = self.index.matrix();
        let mut out = Vec::new();
        for (i, j) in self.index.candidate_pairs() {
            let (Some((a, sa)), Some((b, sb))) = (matrix.row(i), matrix.row(j)) else {
                continue;
            };
            let sim = sa.jaccard(sb)?;
            if sim >= self.config.similarity_threshold {
                out.push((a, b, sim));
            }
        }
        Ok(out)
    }

    /// Estimated similarity from MinHash signatures.
    pub fn estimated_similarity(&self, a: &str, b: &str) -> Result<f64> {
        self.signature(a)?.jaccard(self.signature(b)?)
    }

    /// Exact Jaccard similarity on token sets.
    pub fn exact_similarity(&self, a: &str, b: &str) -> Result<f64> {
        exact_jaccard(&self.token_set_of(a)?, &self.token_set_of(b)?)
    }

    /// Compare estimates with exact Jaccard over every document pair.
    pub fn accuracy(&self, epsilon: f64) -> Result<AccuracyReport> {
        AccuracyReport::evaluate(self.index.matrix(), &self.corpus, epsilon)
    }

    /// Signature of an indexed document.
    pub fn signature(&self, doc_id: &str) -> Result<&MinHashSignature> {
        self.index
            .matrix()
            .get(doc_id)
            .ok_or_else(|| Error::NotFound(doc_id.to_string()))
    }

    /// The configuration in use.
    pub fn config(&self) -> &BlockingConfig {
        &self.config
    }

    /// The underlying LSH index.
    pub fn index(&self) -> &LshIndex {
        &self.index
    }

    /// The signature generator (term hash family).
    pub fn minhash(&self) -> &MinHash {
        &self.minhash
    }

    /// The indexed corpus.
    pub fn corpus(&self) -> &C {
        &self.corpus
    }

    fn token_set_of(&self, doc_id: &str) -> Result<std::collections::HashSet<&str>> {
        self.corpus
            .tokens_of(doc_id)
            .map(token_set)
            .ok_or_else(|| Error::NotFound(doc_id.to_string()))
    }
}
