//! `nearsketch`: MinHash signatures and LSH banding for near-duplicate retrieval.
//!
//! This crate estimates Jaccard similarity between token sets without comparing every pair:
//! - affine hash families over a prime field ([`hashing`])
//! - fixed-length MinHash signatures and the per-corpus signature matrix ([`minhash`])
//! - estimated and exact Jaccard ([`similarity`])
//! - a banding LSH index answering near-duplicate candidate queries ([`lsh`])
//!
//! Around that core sit thin collaborators: tokenization with an injected stop-word
//! policy ([`text`]), in-memory corpora ([`corpus`]), and a blocking pipeline that
//! re-checks LSH candidates with exact Jaccard ([`blocking`]).
//!
//! Everything is deterministic given explicit seeds. Nothing here prints; construction
//! paths emit `tracing` events for whoever installs a subscriber.

#![warn(missing_docs)]

pub mod blocking;
pub mod corpus;
pub mod error;
pub mod hashing;
pub mod lsh;
pub mod minhash;
pub mod similarity;
pub mod text;

pub use blocking::{BlockingConfig, NearDuplicateFinder, NearDuplicateReport};
pub use corpus::{Corpus, InMemoryCorpus};
pub use error::{Error, Result};
pub use hashing::{is_prime, next_prime, HashFamily, HashFunction};
pub use lsh::{BucketKey, LshIndex};
pub use minhash::{MinHash, MinHashSignature, SignatureMatrix};
pub use similarity::{approximate_jaccard, exact_jaccard, AccuracyReport};
pub use text::{StopWords, Tokenizer, WordTokenizer};
