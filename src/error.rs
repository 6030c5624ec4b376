//! Typed error kinds for the retrieval core.
//!
//! `Transient` from the design notes isn't a variant here: a failed field
//! vectorizer transform is recovered locally (substituted with a zero score
//! vector) at the call site in `ranking`/`query` and never surfaces as an
//! error. Everything that *does* reach a caller is one of the variants below.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{what} is not ready: {detail}")]
    NotReady { what: &'static str, detail: String },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("corrupt artifact at {path}: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("fatal error loading {path}: {source}")]
    Fatal {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    pub fn not_ready(what: &'static str, detail: impl Into<String>) -> Self {
        CoreError::NotReady {
            what,
            detail: detail.into(),
        }
    }

    pub fn invalid_query(detail: impl Into<String>) -> Self {
        CoreError::InvalidQuery(detail.into())
    }

    pub fn corrupt(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        CoreError::Corrupt {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
