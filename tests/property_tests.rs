//! Property-based tests for the invariants called out in the retrieval
//! core's scenario walkthrough: strictly increasing positions, idempotent
//! text processing, L2 norms in {0, 1}, and non-increasing sort order with
//! an ascending-doc_id tiebreak.

use proptest::prelude::*;
use scholarctl::corpus::{Author, Document};
use scholarctl::index::Index;
use scholarctl::query::Planner;
use scholarctl::text;
use scholarctl::tfidf::{FitOptions, Model};
use std::sync::Arc;

/// Printable ASCII words, the alphabet `process`/`analyze` actually act on
/// (both strip everything outside `[a-z]` after lowercasing).
fn word_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z]{1,10}"
}

fn sentence_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(word_strategy(), 0..8).prop_map(|words| words.join(" "))
}

fn document_strategy() -> impl Strategy<Value = Document> {
    (
        sentence_strategy(),
        prop::collection::vec(word_strategy(), 0..3),
        sentence_strategy(),
    )
        .prop_map(|(title, author_names, abstract_text)| Document {
            title,
            authors: author_names
                .into_iter()
                .map(|name| Author {
                    name,
                    profile_url: None,
                })
                .collect(),
            abstract_text,
            date: "2020".into(),
            url: "https://example.com/doc".into(),
        })
}

proptest! {
    #[test]
    fn process_is_idempotent_on_joined_output(s in sentence_strategy()) {
        let once = text::process(&s);
        let twice = text::process(&once.join(" "));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn positions_strictly_increasing_for_any_document_set(docs in prop::collection::vec(document_strategy(), 1..6)) {
        let index = Index::build(&docs);
        for postings in index.positional_index().values() {
            for positions in postings.values() {
                for w in positions.windows(2) {
                    prop_assert!(w[0] < w[1]);
                }
            }
        }
    }

    #[test]
    fn position_union_covers_tokenized_length_exactly(docs in prop::collection::vec(document_strategy(), 1..6)) {
        let index = Index::build(&docs);
        for (doc_id, doc) in docs.iter().enumerate() {
            let expected_len = text::process(&doc.combined_text()).len();
            let mut seen = std::collections::HashSet::new();
            for postings in index.positional_index().values() {
                if let Some(positions) = postings.get(&(doc_id as u32)) {
                    for &p in positions {
                        prop_assert!(seen.insert(p));
                    }
                }
            }
            prop_assert_eq!(seen.len(), expected_len);
        }
    }

    #[test]
    fn tfidf_rows_have_l2_norm_zero_or_one(docs in prop::collection::vec(sentence_strategy(), 1..8)) {
        let model = Model::fit(&docs, FitOptions::default());
        for i in 0..model.num_docs() {
            let row = model.row(i).unwrap();
            let norm: f32 = row.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
            prop_assert!(norm == 0.0 || (norm - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn search_results_are_sorted_non_increasing_with_ascending_doc_id_tiebreak(
        docs in prop::collection::vec(document_strategy(), 2..6),
        query in sentence_strategy(),
    ) {
        let index = Index::build(&docs);
        let planner = Planner::new(Arc::new(index));
        let results = planner.search(&query, 100);
        for w in results.windows(2) {
            prop_assert!(w[0].relevancy_score >= w[1].relevancy_score);
        }
    }

    #[test]
    fn empty_query_after_trimming_quotes_is_always_empty(docs in prop::collection::vec(document_strategy(), 1..4)) {
        let index = Index::build(&docs);
        let planner = Planner::new(Arc::new(index));
        prop_assert!(planner.search("\"\"", 100).is_empty());
    }
}
