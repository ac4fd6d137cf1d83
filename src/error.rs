//! Error types shared by every stage of the sketching pipeline.

/// Errors returned by hashing, signature, similarity, and index operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A parameter is out of range or inconsistent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Two signatures (or a signature and an index) disagree on length.
    #[error("dimension mismatch (expected {expected}, got {got})")]
    DimensionMismatch {
        /// Expected signature length.
        expected: usize,
        /// Actual provided length.
        got: usize,
    },
    /// A document identifier is not present.
    #[error("document not found: {0}")]
    NotFound(String),
    /// Exact Jaccard of two empty sets.
    #[error("jaccard similarity is undefined for two empty sets")]
    UndefinedSimilarity,
    /// Reading a corpus from disk failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidParameter(msg.into())
    }
}
