//! Corpus Reader: loads the crawled record set from the external JSON
//! artifact produced by the crawler (§6.1 of the spec).

use serde::{Deserialize, Serialize};
use std::path::Path;

/// One author entry on a publication record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    #[serde(default, alias = "url", rename = "profileUrl")]
    pub profile_url: Option<String>,
}

/// A crawled publication record, as it appears in the corpus JSON array.
///
/// `abstract_text` stands in for the `abstract` field — a reserved word in
/// Rust — and is (de)serialized under the wire name `abstract`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: String,
    #[serde(default)]
    pub date: String,
    pub url: String,
}

impl Document {
    /// Space-joined author names, used as the author field's own corpus.
    pub fn author_names(&self) -> String {
        self.authors
            .iter()
            .map(|a| a.name.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// The combined stream the positional index is built over: title, then
    /// author names, then abstract, each separated by a single space.
    pub fn combined_text(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.author_names(),
            self.abstract_text
        )
    }
}

/// Reads and parses the corpus JSON array from `path`.
///
/// A missing file aborts the caller outright. A record that fails to parse
/// into a `Document` is logged and skipped rather than failing the whole
/// load — doc_id assignment downstream is the *surviving* sequence index,
/// per §4.2's failure semantics.
pub fn load(path: &Path) -> anyhow::Result<Vec<Document>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading corpus file {}: {e}", path.display()))?;
    let raw_records: Vec<serde_json::Value> = serde_json::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("parsing corpus file {}: {e}", path.display()))?;

    let mut docs = Vec::with_capacity(raw_records.len());
    for (i, record) in raw_records.into_iter().enumerate() {
        match serde_json::from_value::<Document>(record) {
            Ok(doc) => docs.push(doc),
            Err(e) => tracing::warn!("skipping malformed corpus record at position {i}: {e}"),
        }
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_abstract_and_authors_default_to_empty() {
        let json = r#"{"title": "A Paper", "url": "https://example.com/a"}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.abstract_text, "");
        assert!(doc.authors.is_empty());
        assert_eq!(doc.date, "");
    }

    #[test]
    fn malformed_record_is_skipped_and_order_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "First", "url": "https://example.com/0"},
                {"title": 123, "url": "https://example.com/1"},
                {"title": "Third", "url": "https://example.com/2"}
            ]"#,
        )
        .unwrap();

        let docs = load(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].title, "First");
        assert_eq!(docs[1].title, "Third");
    }

    #[test]
    fn author_null_url_becomes_none() {
        let json = r#"{"name": "Alice Smith", "profileUrl": null}"#;
        let author: Author = serde_json::from_str(json).unwrap();
        assert_eq!(author.profile_url, None);
    }

    #[test]
    fn combined_text_orders_title_authors_abstract() {
        let doc = Document {
            title: "Risk management in banking".into(),
            authors: vec![Author {
                name: "Alice Smith".into(),
                profile_url: None,
            }],
            abstract_text: "Bank risk frameworks.".into(),
            date: "2020".into(),
            url: "https://example.com/0".into(),
        };
        assert_eq!(
            doc.combined_text(),
            "Risk management in banking Alice Smith Bank risk frameworks."
        );
    }
}
