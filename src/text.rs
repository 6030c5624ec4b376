//! Deterministic text normalization pipeline shared by indexing and querying.
//!
//! `process` is a pure function: lowercase → word tokenization → alphabetic
//! filter → English stopword removal → Porter stemming. Extracting maximal
//! runs of ASCII-alphabetic characters does tokenization and the alphabetic
//! filter in a single pass — punctuation and digits are token separators,
//! and a contraction like `"don't"` naturally splits into adjacent tokens
//! (`"don"`, `"t"`), mirroring the "keeps contractions as adjacent tokens"
//! contract without pulling in a treebank tokenizer.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").unwrap());

fn stemmer() -> &'static Stemmer {
    static STEMMER: once_cell::sync::OnceCell<Stemmer> = once_cell::sync::OnceCell::new();
    STEMMER.get_or_init(|| Stemmer::create(Algorithm::English))
}

/// The standard English stopword list, grounded on the same open corpus of
/// common function words the Python original draws `nltk.corpus.stopwords`
/// from.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any",
        "are", "arent", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "cant", "cannot", "could", "couldnt", "did", "didnt",
        "do", "does", "doesnt", "doing", "dont", "down", "during", "each", "few", "for", "from",
        "further", "had", "hadnt", "has", "hasnt", "have", "havent", "having", "he", "hed",
        "hell", "hes", "her", "here", "heres", "hers", "herself", "him", "himself", "his", "how",
        "hows", "i", "id", "ill", "im", "ive", "if", "in", "into", "is", "isnt", "it", "its",
        "itself", "lets", "me", "more", "most", "mustnt", "my", "myself", "no", "nor", "not",
        "of", "off", "on", "once", "only", "or", "other", "ought", "our", "ours", "ourselves",
        "out", "over", "own", "same", "shant", "she", "shed", "shell", "shes", "should",
        "shouldnt", "so", "some", "such", "than", "that", "thats", "the", "their", "theirs",
        "them", "themselves", "then", "there", "theres", "these", "they", "theyd", "theyll",
        "theyre", "theyve", "this", "those", "through", "to", "too", "under", "until", "up",
        "very", "was", "wasnt", "we", "wed", "well", "were", "weve", "werent", "what", "whats",
        "when", "whens", "where", "wheres", "which", "while", "who", "whos", "whom", "why",
        "whys", "with", "wont", "would", "wouldnt", "you", "youd", "youll", "youre", "youve",
        "your", "yours", "yourself", "yourselves",
    ]
    .into_iter()
    .collect()
});

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(token)
}

/// Exposed for `tfidf`'s vectorizer analyzer, which shares the same English
/// stopword list but does not stem.
pub(crate) fn is_stopword(token: &str) -> bool {
    is_stop_word(token)
}

/// Runs the full pipeline over `text`, returning processed terms in order.
///
/// Empty or non-alphabetic input yields an empty sequence. Deterministic and
/// idempotent on already-processed, space-joined output.
pub fn process(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let stemmer = stemmer();

    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|token| !is_stop_word(token))
        .map(|token| stemmer.stem(token).into_owned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(process("").is_empty());
    }

    #[test]
    fn pipeline_lowercases_tokenizes_filters_stems() {
        let terms = process("Risk Management in Banking");
        assert_eq!(terms, vec!["risk", "manag", "bank"]);
    }

    #[test]
    fn non_alphabetic_tokens_are_dropped() {
        let terms = process("COVID-19 crisis, 2020!");
        assert_eq!(terms, vec!["covid", "crisi"]);
    }

    #[test]
    fn stopwords_are_removed() {
        let terms = process("the bank of england");
        assert_eq!(terms, vec!["bank", "england"]);
    }

    #[test]
    fn process_is_idempotent_on_joined_output() {
        let input = "Risk Management in Banking and Finance";
        let once = process(input);
        let twice = process(&once.join(" "));
        assert_eq!(once, twice);
    }
}
