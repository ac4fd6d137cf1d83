//! Document collections feeding the signature matrix.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::text::Tokenizer;

/// An ordered collection of documents, each with a token multiset.
pub trait Corpus {
    /// Document identifiers in a stable order.
    fn document_ids(&self) -> Vec<&str>;

    /// Tokens of `doc_id`, already stop-word filtered.
    fn tokens_of(&self, doc_id: &str) -> Option<&[String]>;

    /// Number of distinct terms across all documents.
    fn term_count(&self) -> usize {
        let mut terms: HashSet<&str> = HashSet::new();
        for id in self.document_ids() {
            if let Some(tokens) = self.tokens_of(id) {
                terms.extend(tokens.iter().map(String::as_str));
            }
        }
        terms.len()
    }
}

/// A corpus held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCorpus {
    docs: Vec<(String, Vec<String>)>,
    positions: HashMap<String, usize>,
}

impl InMemoryCorpus {
    /// Create an empty corpus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document from pre-filtered tokens. Fails on a repeated id.
    pub fn insert_tokens(&mut self, doc_id: impl Into<String>, tokens: Vec<String>) -> Result<()> {
        let doc_id = doc_id.into();
        if self.positions.contains_key(&doc_id) {
            return Err(Error::invalid(format!("duplicate document id: {doc_id}")));
        }
        self.positions.insert(doc_id.clone(), self.docs.len());
        self.docs.push((doc_id, tokens));
        Ok(())
    }

    /// Add a document from raw text, tokenized and filtered by `tokenizer`.
    pub fn insert_text<T: Tokenizer + ?Sized>(
        &mut self,
        doc_id: impl Into<String>,
        text: &str,
        tokenizer: &T,
    ) -> Result<()> {
        self.insert_tokens(doc_id, tokenizer.terms(text))
    }

    /// Load every regular file in `dir` as a document named by its file name.
    ///
    /// Files are read in file-name order so that row order is reproducible. Bytes that are
    /// not valid UTF-8 are replaced rather than rejected.
    pub fn from_dir<T: Tokenizer + ?Sized>(dir: impl AsRef<Path>, tokenizer: &T) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();

        let mut corpus = Self::new();
        for path in files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::invalid(format!("unnamed file in {}", dir.display())))?;
            let bytes = fs::read(&path)?;
            corpus.insert_text(name, &String::from_utf8_lossy(&bytes), tokenizer)?;
        }
        tracing::debug!(dir = %dir.display(), docs = corpus.len(), "loaded corpus");
        Ok(corpus)
    }

    /// Number of documents.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// True if no documents.
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl Corpus for InMemoryCorpus {
    fn document_ids(&self) -> Vec<&str> {
        self.docs.iter().map(|(id, _)| id.as_str()).collect()
    }

    fn tokens_of(&self, doc_id: &str) -> Option<&[String]> {
        self.positions
            .get(doc_id)
            .map(|&i| self.docs[i].1.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::WordTokenizer;

    #[test]
    fn insertion_order_and_lookup() {
        let tok = WordTokenizer::default();
        let mut c = InMemoryCorpus::new();
        c.insert_text("b", "the quick brown fox", &tok).unwrap();
        c.insert_text("a", "a quick brown fox jumps", &tok).unwrap();
        assert_eq!(c.document_ids(), vec!["b", "a"]);
        assert_eq!(c.tokens_of("b").unwrap(), ["quick", "brown", "fox"]);
        assert!(c.tokens_of("missing").is_none());
        assert_eq!(c.term_count(), 4);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut c = InMemoryCorpus::new();
        c.insert_tokens("x", vec![]).unwrap();
        assert!(matches!(
            c.insert_tokens("x", vec![]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn from_dir_reads_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "Lazy dogs sleep").unwrap();
        fs::write(dir.path().join("a.txt"), "The quick brown fox").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let c = InMemoryCorpus::from_dir(dir.path(), &WordTokenizer::default()).unwrap();
        assert_eq!(c.document_ids(), vec!["a.txt", "b.txt"]);
        assert_eq!(c.tokens_of("b.txt").unwrap(), ["lazy", "dogs", "sleep"]);
    }

    #[test]
    fn from_dir_accepts_non_utf8_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "quick brown fox").unwrap();
        fs::write(dir.path().join("b.txt"), b"caf\xe9 quick brown fox").unwrap();

        let c = InMemoryCorpus::from_dir(dir.path(), &WordTokenizer::default()).unwrap();
        assert_eq!(c.document_ids(), vec!["a.txt", "b.txt"]);
        let tokens = c.tokens_of("b.txt").unwrap();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0], "caf\u{fffd}");
        assert_eq!(&tokens[1..], ["quick", "brown", "fox"]);
    }

    #[test]
    fn from_dir_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            InMemoryCorpus::from_dir(missing, &WordTokenizer::default()),
            Err(Error::Io(_))
        ));
    }
}
