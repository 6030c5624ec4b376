//! Field vector spaces: a from-scratch TF-IDF vectorizer (vocabulary +
//! sparse matrix), per spec §3/§9 design note (b) — vocabulary keyed by
//! `term` or `term₁␣term₂`, smoothed IDF, L2-normalized rows. Unlike
//! `text::process`, the vectorizer analyzer does not stem: it mirrors
//! scikit-learn's default `TfidfVectorizer` token pattern (lowercase,
//! English stopwords, unigrams + bigrams), which the source lineage uses
//! verbatim and does not compose with Porter stemming.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9]{2,}").unwrap());

fn analyze(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let unigrams: Vec<String> = TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !crate::text::is_stopword(t))
        .map(String::from)
        .collect();

    let mut grams = Vec::with_capacity(unigrams.len() * 2);
    for i in 0..unigrams.len() {
        grams.push(unigrams[i].clone());
        if i + 1 < unigrams.len() {
            grams.push(format!("{} {}", unigrams[i], unigrams[i + 1]));
        }
    }
    grams
}

/// A sparse row: `(vocabulary_index, weight)` pairs sorted by index.
pub type SparseRow = Vec<(u32, f32)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    term_to_index: AHashMap<String, u32>,
}

impl Vocabulary {
    pub fn len(&self) -> usize {
        self.term_to_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.term_to_index.is_empty()
    }

    pub fn index_of(&self, term: &str) -> Option<u32> {
        self.term_to_index.get(term).copied()
    }
}

/// Controls vocabulary pruning at fit time. The field vectorizers used by
/// the retrieval core use the defaults (keep everything); the classifier's
/// training vectorizer uses `max_df = 0.95, min_df = 2` per spec §6.6.
#[derive(Debug, Clone, Copy)]
pub struct FitOptions {
    pub max_df: f32,
    pub min_df: usize,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            max_df: 1.0,
            min_df: 1,
        }
    }
}

/// A fitted TF-IDF vectorizer plus the matrix it produced for its training
/// corpus. `transform` reuses the fitted vocabulary and IDF to vectorize new
/// text (queries) consistently — IDF is never recomputed post-fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    vocabulary: Vocabulary,
    idf: Vec<f32>,
    matrix: Vec<SparseRow>,
}

fn l2_normalize(row: &mut SparseRow) {
    let norm: f32 = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for (_, w) in row.iter_mut() {
            *w /= norm;
        }
    }
}

impl Model {
    /// Fits a vocabulary and IDF table over `corpus`, then transforms each
    /// document into an L2-normalized sparse row.
    pub fn fit(corpus: &[String], opts: FitOptions) -> Model {
        let n_docs = corpus.len();
        let tokenized: Vec<Vec<String>> = corpus.iter().map(|t| analyze(t)).collect();

        let mut doc_freq: AHashMap<String, usize> = AHashMap::new();
        for doc_tokens in &tokenized {
            let mut seen = ahash::AHashSet::new();
            for tok in doc_tokens {
                if seen.insert(tok.as_str()) {
                    *doc_freq.entry(tok.clone()).or_insert(0) += 1;
                }
            }
        }

        let max_df_count = (opts.max_df * n_docs as f32).ceil() as usize;
        let mut terms: Vec<&String> = doc_freq
            .iter()
            .filter(|(_, &df)| df >= opts.min_df && (n_docs == 0 || df <= max_df_count.max(1)))
            .map(|(term, _)| term)
            .collect();
        terms.sort();

        let mut term_to_index = AHashMap::new();
        for (i, term) in terms.iter().enumerate() {
            term_to_index.insert((*term).clone(), i as u32);
        }
        let vocabulary = Vocabulary { term_to_index };

        let idf: Vec<f32> = terms
            .iter()
            .map(|term| {
                let df = *doc_freq.get(term.as_str()).unwrap_or(&0) as f32;
                ((1.0 + n_docs as f32) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let matrix: Vec<SparseRow> = tokenized
            .iter()
            .map(|doc_tokens| {
                let mut counts: AHashMap<u32, f32> = AHashMap::new();
                for tok in doc_tokens {
                    if let Some(idx) = vocabulary.index_of(tok) {
                        *counts.entry(idx).or_insert(0.0) += 1.0;
                    }
                }
                let mut row: SparseRow = counts
                    .into_iter()
                    .map(|(idx, count)| (idx, count * idf[idx as usize]))
                    .collect();
                row.sort_by_key(|(idx, _)| *idx);
                l2_normalize(&mut row);
                row
            })
            .collect();

        Model {
            vocabulary,
            idf,
            matrix,
        }
    }

    /// Vectorizes `text` against the fitted vocabulary/IDF. Terms absent
    /// from the vocabulary are dropped (never panics); if none of the
    /// query's terms are in-vocabulary the result is the zero vector.
    pub fn transform_query(&self, text: &str) -> SparseRow {
        let mut counts: AHashMap<u32, f32> = AHashMap::new();
        for tok in analyze(text) {
            if let Some(idx) = self.vocabulary.index_of(&tok) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }
        let mut row: SparseRow = counts
            .into_iter()
            .map(|(idx, count)| (idx, count * self.idf[idx as usize]))
            .collect();
        row.sort_by_key(|(idx, _)| *idx);
        l2_normalize(&mut row);
        row
    }

    /// Cosine similarity of `query` (assumed L2-normalized, as returned by
    /// `transform_query`) against every row of the fitted matrix. Since both
    /// sides are L2-normalized this is a plain dot product.
    pub fn similarities(&self, query: &SparseRow) -> Vec<f32> {
        self.matrix.iter().map(|row| dot(query, row)).collect()
    }

    pub fn num_docs(&self) -> usize {
        self.matrix.len()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn row(&self, doc_id: usize) -> Option<&SparseRow> {
        self.matrix.get(doc_id)
    }
}

/// Dot product of two sparse rows, both sorted ascending by index.
fn dot(a: &SparseRow, b: &SparseRow) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
