//! # webstract
//!
//! A fast, lightweight library for converting JATS XML research articles
//! ("baseprints") into a normalized, stable document model.
//!
//! ## Features
//!
//! - Ingests heterogeneous, HTML-flavored JATS XML
//! - Retargets HTML-shaped markup (`ol`/`ul`/`li`, `dl`/`dt`/`dd`, `br`)
//!   to JATS equivalents
//! - Resolves in-text citations with numeric-style first-appearance
//!   numbering and group collapse
//! - Produces an immutable [`Document`] ("webstract") for presentation
//!   stages, with JSON interchange and JATS re-export that round-trip
//!
//! ## Quick Start
//!
//! ```no_run
//! use webstract::{ConversionConfig, convert_file};
//!
//! // Convert a baseprint article to the canonical model
//! let conversion = convert_file("article.xml", &ConversionConfig::default()).unwrap();
//! let json = webstract::to_json_string(&conversion.document).unwrap();
//! ```
//!
//! ## Pipeline
//!
//! Data flows strictly forward, one owned tree per conversion run:
//!
//! 1. Parse XML into an arena tree
//! 2. Retarget HTML-shaped elements ([`transform::retarget`])
//! 3. Synthesize required-but-absent metadata ([`transform::synthesize_metadata`])
//! 4. Build the reference table ([`biblio::build_ref_table`])
//! 5. Assemble the document model ([`assemble::assemble`])
//! 6. Resolve citations ([`resolve::resolve_citations`]) and validate
//!
//! Multiple documents may be converted in parallel by independent runs;
//! nothing is shared between them.

pub mod assemble;
pub mod biblio;
pub mod error;
pub mod export;
pub mod interchange;
pub mod issue;
pub mod model;
pub mod resolve;
pub mod transform;
pub mod xml;

use std::path::Path;

pub use biblio::{BiblioFormatter, PlainFormatter, RefTable, rendered_references};
pub use error::{Error, Result};
pub use export::export_jats;
pub use interchange::{from_json_str, to_json_string};
pub use issue::{Issue, IssueKind, IssueLog};
pub use model::{
    BibItem, Block, Body, Contributor, Document, Inline, Orcid, RefAuthor, Section,
};
pub use resolve::CitationConfig;

/// Configuration for one conversion run, passed explicitly so parallel
/// conversions never share ambient state.
#[derive(Debug, Clone, Default)]
pub struct ConversionConfig {
    pub citation: CitationConfig,
}

/// The result of a successful conversion: the immutable document plus any
/// non-fatal format issues observed along the way.
#[derive(Debug)]
pub struct Conversion {
    pub document: Document,
    pub issues: Vec<Issue>,
}

/// Convert a baseprint article from XML text.
///
/// Runs the full forward pipeline. On any fatal condition (structure,
/// duplicate key, unresolved citation, cross-reference) the error
/// propagates and no partial document is returned.
pub fn convert_str(xml: &str, config: &ConversionConfig) -> Result<Conversion> {
    let mut tree = xml::parse_str(xml)?;
    let mut issues = issue::IssueLog::new();

    transform::retarget(&mut tree, &mut issues)?;
    transform::synthesize_metadata(&mut tree)?;
    let table = biblio::build_ref_table(&tree, &mut issues)?;
    let mut document = assemble::assemble(&tree, &table, &mut issues)?;
    resolve::resolve_citations(&mut document, &table, &config.citation, &mut issues)?;
    assemble::validate(&document)?;

    Ok(Conversion {
        document,
        issues: issues.into_vec(),
    })
}

/// Convert a baseprint article from raw bytes (must be UTF-8).
pub fn convert_bytes(xml: &[u8], config: &ConversionConfig) -> Result<Conversion> {
    let text = String::from_utf8(xml.to_vec())?;
    convert_str(&text, config)
}

/// Convert a baseprint article from a file on disk.
pub fn convert_file<P: AsRef<Path>>(path: P, config: &ConversionConfig) -> Result<Conversion> {
    let bytes = std::fs::read(path)?;
    convert_bytes(&bytes, config)
}
