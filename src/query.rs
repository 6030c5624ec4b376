//! Query Planner (§4.5): parses the query (phrase vs. bag-of-words),
//! invokes the phrase matcher and/or ranker, fuses field scores, sorts,
//! truncates, and renders results.

use crate::error::CoreError;
use crate::index::Index;
use crate::models::Result as SearchResult;
use crate::phrase;
use crate::ranking::{self, FieldWeightedTfIdf};
use crate::text;
use std::str::FromStr;
use std::sync::Arc;

/// One of the three independently-vectorized fields, used by
/// `Planner::search_field` and the CLI REPL's `field:text` prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Author,
    Abstract,
}

impl FromStr for Field {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(Field::Title),
            "author" => Ok(Field::Author),
            "abstract" => Ok(Field::Abstract),
            other => Err(CoreError::invalid_query(format!(
                "unknown field '{other}': expected title, author, or abstract"
            ))),
        }
    }
}

/// Default truncation for the HTTP path (spec leaves CLI display to
/// truncate to 10; the planner's own default matches the HTTP contract).
pub const DEFAULT_TOP_K: usize = 1000;

/// Holds a shared, read-only reference to a loaded Index and answers
/// `search`/`search_field` queries against it. Cheap to clone (an `Arc`
/// bump); safe to share across concurrent request handlers with no locks,
/// since nothing ever mutates the Index after it's built or loaded.
#[derive(Clone)]
pub struct Planner {
    index: Arc<Index>,
}

impl Planner {
    pub fn new(index: Arc<Index>) -> Self {
        Planner { index }
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    fn is_phrase_query(query_text: &str) -> bool {
        query_text.len() >= 2 && query_text.starts_with('"') && query_text.ends_with('"')
    }

    fn strip_quotes(query_text: &str) -> &str {
        &query_text[1..query_text.len() - 1]
    }

    /// The full planner: `search(query_text, top_k) -> [Result]`.
    pub fn search(&self, query_text: &str, top_k: usize) -> Vec<SearchResult> {
        let is_phrase = Self::is_phrase_query(query_text);
        let effective_text = if is_phrase {
            Self::strip_quotes(query_text)
        } else {
            query_text
        };

        // The leading-quote check in `adapt_weights` inspects the original,
        // un-stripped query text — a quoted phrase query also gets the
        // long-query weight bump. Preserved intentionally; see DESIGN.md.
        let weights = ranking::adapt_weights(query_text);
        let ranker = FieldWeightedTfIdf::new(&self.index, weights);
        let fused = ranker.fused_scores(effective_text);

        let candidate_scores: Vec<(u32, f32)> = if is_phrase {
            let terms = text::process(effective_text);
            let matches = phrase::find(&terms, self.index.positional_index());
            if matches.is_empty() {
                return Vec::new();
            }
            matches
                .into_iter()
                .map(|doc_id| (doc_id, fused[doc_id as usize]))
                .collect()
        } else {
            fused
                .iter()
                .enumerate()
                .filter(|&(_, &score)| score > 0.0)
                .map(|(doc_id, &score)| (doc_id as u32, score))
                .collect()
        };

        Self::sort_and_render(&self.index, candidate_scores, top_k)
    }

    /// Field-specific mode: scores only the given field, filters to
    /// positive scores, sorts, truncates, renders. Fails with
    /// `CoreError::InvalidQuery` for an unrecognized field.
    pub fn search_field(
        &self,
        query_text: &str,
        field: Field,
        top_k: usize,
    ) -> Vec<SearchResult> {
        let model = match field {
            Field::Title => self.index.title_model(),
            Field::Author => self.index.author_model(),
            Field::Abstract => self.index.abstract_model(),
        };

        let query_vec = model.transform_query(query_text);
        let sims = model.similarities(&query_vec);

        let candidate_scores: Vec<(u32, f32)> = sims
            .iter()
            .enumerate()
            .filter(|&(_, &score)| score > 0.0)
            .map(|(doc_id, &score)| (doc_id as u32, score))
            .collect();

        Self::sort_and_render(&self.index, candidate_scores, top_k)
    }

    fn sort_and_render(
        index: &Index,
        mut candidates: Vec<(u32, f32)>,
        top_k: usize,
    ) -> Vec<SearchResult> {
        candidates.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        candidates.truncate(top_k);

        candidates
            .into_iter()
            .filter_map(|(doc_id, score)| {
                index.doc(doc_id).map(|doc| SearchResult::render(doc, score))
            })
            .collect()
    }
}
