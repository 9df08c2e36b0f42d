//! Error types for webstract operations.

use thiserror::Error;

/// Errors that can occur while converting a baseprint document.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Illegal or unexpected nesting found while retargeting or assembling.
    #[error("Invalid structure: {0}")]
    Structure(String),

    /// Two entries in the reference list share the same id.
    #[error("Duplicate reference key: {0}")]
    DuplicateKey(String),

    /// A citation points at a key missing from the reference list.
    #[error("Unresolved citation key {key:?} in section {section:?}")]
    UnresolvedCitation { key: String, section: String },

    /// A non-citation cross-reference points at a missing target id.
    #[error("Cross-reference to unknown target: {0}")]
    CrossReference(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),
}

impl Error {
    /// Build a structure error for an element found under the wrong parent.
    pub(crate) fn bad_parent(tag: &str, parent: Option<&str>) -> Error {
        match parent {
            Some(p) => Error::Structure(format!("<{tag}> not allowed under <{p}>")),
            None => Error::Structure(format!("<{tag}> has no parent element")),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
