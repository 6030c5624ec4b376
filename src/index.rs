//! The persistent positional/TF-IDF index: the Indexer (§4.2), the Index
//! Artifact's in-memory shape (§3, §6.2), and the Index Loader (§4.6).

use crate::corpus::Document;
use crate::error::CoreError;
use crate::text;
use crate::tfidf::{self, FitOptions};
use ahash::AHashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Schema version of the persisted artifact. Bumped whenever the on-disk
/// shape changes in a way `Index::load` must reject rather than silently
/// misinterpret.
pub const SCHEMA_VERSION: u32 = 1;

/// term → doc_id → strictly increasing 0-based positions in the combined
/// (title ⊕ author-names ⊕ abstract) token stream.
pub type PositionalIndex = AHashMap<String, AHashMap<u32, Vec<u32>>>;

/// The full persisted/loaded index: positional postings, the document
/// store, and the three independent field TF-IDF models. Immutable once
/// built or loaded — there is no mutation path once a value of this type
/// exists, which is what lets the query planner share it across concurrent
/// readers without locks.
#[derive(Debug, Serialize, Deserialize)]
pub struct Index {
    schema_version: u32,
    positional_index: PositionalIndex,
    doc_store: Vec<Document>,
    /// Combined-stream token count per doc_id. Used only by the BM25
    /// ranker variant (`ranking::Bm25`); the default field-weighted TF-IDF
    /// path never reads this.
    doc_lengths: Vec<u32>,
    title_model: tfidf::Model,
    author_model: tfidf::Model,
    abstract_model: tfidf::Model,
}

impl Index {
    pub fn doc_store(&self) -> &[Document] {
        &self.doc_store
    }

    pub fn doc(&self, doc_id: u32) -> Option<&Document> {
        self.doc_store.get(doc_id as usize)
    }

    pub fn len(&self) -> usize {
        self.doc_store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_store.is_empty()
    }

    pub fn positional_index(&self) -> &PositionalIndex {
        &self.positional_index
    }

    pub fn title_model(&self) -> &tfidf::Model {
        &self.title_model
    }

    pub fn author_model(&self) -> &tfidf::Model {
        &self.author_model
    }

    pub fn abstract_model(&self) -> &tfidf::Model {
        &self.abstract_model
    }

    pub fn doc_length(&self, doc_id: u32) -> u32 {
        self.doc_lengths.get(doc_id as usize).copied().unwrap_or(0)
    }

    pub fn avg_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            return 0.0;
        }
        self.doc_lengths.iter().sum::<u32>() as f32 / self.doc_lengths.len() as f32
    }

    /// Builds a fresh index from a surviving-order sequence of documents.
    /// `doc_id` is assigned by position in `documents`.
    pub fn build(documents: &[Document]) -> Index {
        let title_corpus: Vec<String> = documents.iter().map(|d| d.title.clone()).collect();
        let author_corpus: Vec<String> = documents.iter().map(|d| d.author_names()).collect();
        let abstract_corpus: Vec<String> =
            documents.iter().map(|d| d.abstract_text.clone()).collect();

        // Fitting the three field vectorizers is independent work; the
        // teacher crate reaches for rayon for this kind of embarrassingly
        // parallel fan-out.
        let (title_model, (author_model, abstract_model)) = rayon::join(
            || tfidf::Model::fit(&title_corpus, FitOptions::default()),
            || {
                rayon::join(
                    || tfidf::Model::fit(&author_corpus, FitOptions::default()),
                    || tfidf::Model::fit(&abstract_corpus, FitOptions::default()),
                )
            },
        );

        let per_doc_tokens: Vec<Vec<String>> = documents
            .par_iter()
            .map(|doc| text::process(&doc.combined_text()))
            .collect();

        let doc_lengths: Vec<u32> = per_doc_tokens.iter().map(|t| t.len() as u32).collect();

        let mut positional_index: PositionalIndex = AHashMap::new();
        for (doc_id, tokens) in per_doc_tokens.into_iter().enumerate() {
            for (pos, term) in tokens.into_iter().enumerate() {
                positional_index
                    .entry(term)
                    .or_default()
                    .entry(doc_id as u32)
                    .or_default()
                    .push(pos as u32);
            }
        }

        Index {
            schema_version: SCHEMA_VERSION,
            positional_index,
            doc_store: documents.to_vec(),
            doc_lengths,
            title_model,
            author_model,
            abstract_model,
        }
    }

    /// Loads and builds an index straight from a corpus JSON file (used by
    /// the `index` CLI subcommand). A missing corpus file aborts loudly.
    pub fn build_from_corpus_file(path: &Path) -> anyhow::Result<Index> {
        let documents = crate::corpus::load(path)?;
        Ok(Index::build(&documents))
    }

    /// Persists the artifact atomically: write to a sibling temp file,
    /// fsync, then rename over the destination. A crash mid-write never
    /// leaves a partial artifact at `path`.
    pub fn save_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = postcard::to_allocvec(self)?;
        let tmp_path = path.with_extension("tmp");
        {
            let mut f = std::fs::File::create(&tmp_path)?;
            f.write_all(&bytes)?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Loads a persisted artifact from `path`, validating schema version
    /// and that all three matrices' row counts equal the doc store size.
    pub fn load(path: &Path) -> Result<Index, CoreError> {
        let bytes = std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::not_ready("index", format!("artifact not found at {}", path.display()))
            } else {
                CoreError::Fatal {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;

        let index: Index = postcard::from_bytes(&bytes)
            .map_err(|e| CoreError::corrupt(path, format!("deserialization failed: {e}")))?;

        if index.schema_version != SCHEMA_VERSION {
            return Err(CoreError::corrupt(
                path,
                format!(
                    "schema version mismatch: artifact has {}, expected {SCHEMA_VERSION}",
                    index.schema_version
                ),
            ));
        }

        let n = index.doc_store.len();
        if index.title_model.num_docs() != n
            || index.author_model.num_docs() != n
            || index.abstract_model.num_docs() != n
        {
            return Err(CoreError::corrupt(
                path,
                "matrix row counts do not match doc store size",
            ));
        }

        Ok(index)
    }
}
