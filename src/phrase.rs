//! Phrase Matcher (§4.4): finds documents containing a sequence of already
//! processed terms as a contiguous, in-order sub-sequence, using the
//! positional index. Intervening stopwords collapse because they were
//! dropped before position numbering — phrase queries match under the same
//! normalization pipeline as documents, which is an intentional contract,
//! not an artifact.

use crate::index::PositionalIndex;
use ahash::AHashSet;

/// Returns the set of doc_ids containing `terms` as a contiguous sequence.
/// An empty `terms` slice or a first/subsequent term absent from the index
/// yields an empty set.
pub fn find(terms: &[String], index: &PositionalIndex) -> AHashSet<u32> {
    if terms.is_empty() {
        return AHashSet::new();
    }

    let Some(first_postings) = index.get(&terms[0]) else {
        return AHashSet::new();
    };
    let mut candidates: AHashSet<u32> = first_postings.keys().copied().collect();

    for i in 1..terms.len() {
        if candidates.is_empty() {
            return AHashSet::new();
        }
        let Some(postings) = index.get(&terms[i]) else {
            return AHashSet::new();
        };
        let prev_postings = index.get(&terms[i - 1]).expect("checked on a prior iteration or as the first term");

        candidates = candidates
            .into_iter()
            .filter(|doc_id| {
                let (Some(prev_positions), Some(cur_positions)) =
                    (prev_postings.get(doc_id), postings.get(doc_id))
                else {
                    return false;
                };
                prev_positions
                    .iter()
                    .any(|p| cur_positions.binary_search(&(p + 1)).is_ok())
            })
            .collect();
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahash::AHashMap;

    fn build_index(docs: &[(&str, &[&str])]) -> PositionalIndex {
        let mut index: PositionalIndex = AHashMap::new();
        for (doc_id, (_, terms)) in docs.iter().enumerate() {
            for (pos, term) in terms.iter().enumerate() {
                index
                    .entry(term.to_string())
                    .or_default()
                    .entry(doc_id as u32)
                    .or_default()
                    .push(pos as u32);
            }
        }
        index
    }

    #[test]
    fn empty_phrase_matches_nothing() {
        let index = build_index(&[("d0", &["risk", "manag"])]);
        assert!(find(&[], &index).is_empty());
    }

    #[test]
    fn order_matters() {
        let index = build_index(&[("d0", &["risk", "manag", "bank"])]);
        let forward: Vec<String> = vec!["risk".into(), "manag".into()];
        let reversed: Vec<String> = vec!["manag".into(), "risk".into()];
        assert_eq!(find(&forward, &index).len(), 1);
        assert!(find(&reversed, &index).is_empty());
    }

    #[test]
    fn absent_term_yields_empty_set() {
        let index = build_index(&[("d0", &["risk", "manag"])]);
        let phrase: Vec<String> = vec!["risk".into(), "nonexistentterm".into()];
        assert!(find(&phrase, &index).is_empty());
    }

    #[test]
    fn single_term_phrase_matches_all_docs_containing_it() {
        let index = build_index(&[("d0", &["risk"]), ("d1", &["manag"]), ("d2", &["risk", "manag"])]);
        let phrase: Vec<String> = vec!["risk".into()];
        let matches = find(&phrase, &index);
        assert_eq!(matches.len(), 2);
        assert!(matches.contains(&0));
        assert!(matches.contains(&2));
    }
}
