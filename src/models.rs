//! The Result Record (§6.4): the rendered, client-facing shape of a ranked
//! publication. Distinct from `corpus::Document`/`corpus::Author`, which are
//! the raw crawled/stored shape — `models::Result` is what `search` and
//! `search_field` actually return.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultAuthor {
    pub name: String,
    #[serde(rename = "profileUrl")]
    pub profile_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Result {
    pub title: String,
    pub authors: Vec<ResultAuthor>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub date: String,
    #[serde(rename = "publicationUrl")]
    pub publication_url: String,
    #[serde(rename = "relevancyScore")]
    pub relevancy_score: f64,
}

impl Result {
    /// Renders a scored document into the client-facing Result shape,
    /// rounding the score to 4 decimal places per §6.4.
    pub fn render(doc: &crate::corpus::Document, score: f32) -> Result {
        Result {
            title: doc.title.clone(),
            authors: doc
                .authors
                .iter()
                .map(|a| ResultAuthor {
                    name: a.name.clone(),
                    profile_url: a.profile_url.clone(),
                })
                .collect(),
            abstract_text: doc.abstract_text.clone(),
            date: doc.date.clone(),
            publication_url: doc.url.clone(),
            relevancy_score: (score as f64 * 10000.0).round() / 10000.0,
        }
    }
}
