//! Core document model ("webstract") for baseprint processing.
//!
//! This module contains:
//! - [`Document`]: the canonical, immutable result of a conversion
//! - Contributor and ORCID types
//! - Section tree with block/inline content nodes
//! - Bibliographic reference items
//!
//! The model is format-agnostic: it carries everything needed to render
//! HTML or print output, or to regenerate equivalent JATS XML, without
//! referring back to the source tree. All types serialize with serde and
//! compare with `==`, which is what makes the round-trip guarantees
//! testable.

use serde::{Deserialize, Serialize};

/// Sentinel title used when the source document has none.
///
/// Titles are cosmetic, so a missing one is tolerated; anything
/// reference-related is validated strictly instead.
pub const NO_TITLE: &str = "No Title";

/// Canonical in-memory representation of one baseprint article.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Article title as an inline run (may carry markup).
    pub title: Vec<Inline>,
    /// Authors in document order.
    pub contributors: Vec<Contributor>,
    /// Abstract as block content.
    #[serde(rename = "abstract")]
    pub abstract_: Vec<Block>,
    /// Body content: top-level blocks before the first section, then sections.
    pub body: Body,
    /// Bibliography in citation-number order after resolution.
    pub references: Vec<BibItem>,
    /// License and copyright information, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    /// Edition metadata, when the source carries succession information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<EditionMeta>,
}

/// Body content: blocks before the first section plus the section tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub blocks: Vec<Block>,
    pub sections: Vec<Section>,
}

/// One author of the article.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_names: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orcid: Option<Orcid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Reference to an affiliation declared elsewhere in the front matter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl Contributor {
    /// Display name in "given surname" order, skipping absent parts.
    pub fn display_name(&self) -> String {
        match (&self.given_names, &self.surname) {
            (Some(g), Some(s)) => format!("{g} {s}"),
            (Some(g), None) => g.clone(),
            (None, Some(s)) => s.clone(),
            (None, None) => String::new(),
        }
    }
}

/// A validated ORCID, stored as the bare 16-character ISNI.
///
/// Serialized in URL form (`https://orcid.org/0000-0002-1825-0097`), the
/// same form accepted on input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Orcid {
    isni: String,
}

impl Orcid {
    /// Parse an ORCID from URL or bare form.
    ///
    /// Accepts `https://orcid.org/...`, `http://orcid.org/...`, or the
    /// 19-character dashed form; the checksum character may be `X`.
    pub fn from_url(url: &str) -> Option<Orcid> {
        let rest = url
            .strip_prefix("https://orcid.org/")
            .or_else(|| url.strip_prefix("http://orcid.org/"))
            .unwrap_or(url);
        let isni: String = rest.chars().filter(|&c| c != '-').collect();
        let ok = isni.is_ascii()
            && isni.len() == 16
            && isni[..15].chars().all(|c| c.is_ascii_digit())
            && isni[15..]
                .chars()
                .all(|c| c.is_ascii_digit() || c == 'X');
        if ok { Some(Orcid { isni }) } else { None }
    }

    /// The dashed 19-character form.
    pub fn as_19_chars(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            &self.isni[0..4],
            &self.isni[4..8],
            &self.isni[8..12],
            &self.isni[12..16]
        )
    }

    /// The canonical URL form.
    pub fn as_url(&self) -> String {
        format!("https://orcid.org/{}", self.as_19_chars())
    }
}

impl std::fmt::Display for Orcid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_url())
    }
}

impl TryFrom<String> for Orcid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Orcid::from_url(&value).ok_or_else(|| format!("invalid ORCID: {value:?}"))
    }
}

impl From<Orcid> for String {
    fn from(orcid: Orcid) -> String {
        orcid.as_url()
    }
}

/// A section of body content. Sections nest to arbitrary depth.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    /// Cross-reference target id; unique among all sections when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: Vec<Inline>,
    pub blocks: Vec<Block>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
}

/// Block-level content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(Vec<Inline>),
    List(List),
    DefList(DefList),
    Table(Table),
    /// Displayed quotation containing block content.
    Quote(Vec<Block>),
    /// Preformatted or code block with inline content.
    Preformat(Vec<Inline>),
    Figure(Figure),
}

/// Ordered or bulleted list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub kind: ListKind,
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Order,
    Bullet,
}

/// One list item: block content only (inline runs are paragraph-wrapped
/// upstream by the retargeter).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

/// Definition list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefList {
    pub items: Vec<DefItem>,
}

/// A term paired with its definitions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DefItem {
    pub term: Vec<Inline>,
    pub defs: Vec<Definition>,
}

/// One definition's block content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Definition {
    pub blocks: Vec<Block>,
}

/// Table with separate header and body row groups.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub head: Vec<TableRow>,
    pub body: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableCell {
    pub header: bool,
    pub content: Vec<Inline>,
}

/// Figure with optional caption and graphic reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Figure {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub caption: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graphic: Option<String>,
}

/// Inline content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Bold(Vec<Inline>),
    /// Code span (monospace).
    Code(Vec<Inline>),
    /// Cross-reference to a section, table, or figure id.
    CrossRef { target: String, content: Vec<Inline> },
    /// Citation of one or more bibliography entries.
    ///
    /// `keys` is in encounter order. After resolution `labels` holds the
    /// final citation numbers (sorted and deduplicated when collapsing).
    /// Before resolution it carries the numbers claimed by the source
    /// markup, aligned with `keys`, with 0 for "no claim"; the resolver
    /// validates and replaces them.
    CiteRef { keys: Vec<String>, labels: Vec<u32> },
    /// External hyperlink.
    Link { href: String, content: Vec<Inline> },
    /// Line break.
    Break,
}

impl Inline {
    /// Plain text of this inline node and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Inline::Text(s) => out.push_str(s),
            Inline::Emphasis(inner)
            | Inline::Bold(inner)
            | Inline::Code(inner)
            | Inline::CrossRef { content: inner, .. }
            | Inline::Link { content: inner, .. } => {
                for node in inner {
                    node.collect_text(out);
                }
            }
            Inline::CiteRef { labels, .. } => {
                let rendered: Vec<String> = labels.iter().map(|n| n.to_string()).collect();
                out.push_str(&rendered.join(","));
            }
            Inline::Break => out.push('\n'),
        }
    }
}

/// Plain text of an inline run.
pub fn plain_text(run: &[Inline]) -> String {
    let mut out = String::new();
    for node in run {
        node.collect_text(&mut out);
    }
    out
}

/// A calendar date, possibly partial (year only, or year and month).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Date {
    pub year: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<u32>,
}

impl Date {
    pub fn year(year: i32) -> Self {
        Date {
            year,
            month: None,
            day: None,
        }
    }
}

/// One bibliography entry in normalized record shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BibItem {
    /// Unique key within the reference list (the JATS `ref/@id`).
    pub key: String,
    pub authors: Vec<RefAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Journal, book, or site the work appeared in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    /// Page range as printed ("11-21") or a single first page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessed: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_loc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_type: Option<String>,
    /// Visible text of a `mixed-citation`, kept as a fallback when the
    /// entry carries no structured fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// A cited author: a structured personal name or a collaboration string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RefAuthor {
    Name {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        surname: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        given_names: Option<String>,
    },
    Collab(String),
}

/// License and copyright information from the `permissions` block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright_statement: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub license_paragraph: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc_license: Option<CcLicense>,
}

/// Recognized Creative Commons license classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CcLicense {
    Cc0,
    By,
    BySa,
    ByNc,
    ByNcSa,
    ByNd,
    ByNcNd,
}

impl CcLicense {
    /// Classify a license URL by its creativecommons.org prefix.
    pub fn from_url(url: &str) -> Option<CcLicense> {
        const PREFIXES: &[(&str, CcLicense)] = &[
            (
                "https://creativecommons.org/publicdomain/zero/",
                CcLicense::Cc0,
            ),
            ("https://creativecommons.org/licenses/by/", CcLicense::By),
            (
                "https://creativecommons.org/licenses/by-sa/",
                CcLicense::BySa,
            ),
            (
                "https://creativecommons.org/licenses/by-nc/",
                CcLicense::ByNc,
            ),
            (
                "https://creativecommons.org/licenses/by-nc-sa/",
                CcLicense::ByNcSa,
            ),
            (
                "https://creativecommons.org/licenses/by-nd/",
                CcLicense::ByNd,
            ),
            (
                "https://creativecommons.org/licenses/by-nc-nd/",
                CcLicense::ByNcNd,
            ),
        ];
        PREFIXES
            .iter()
            .find(|(prefix, _)| url.starts_with(prefix))
            .map(|(_, license)| *license)
    }
}

/// Edition metadata for succession-tracked baseprints.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditionMeta {
    /// Digital succession identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub succession: Option<String>,
    /// Edition number within the succession.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<u32>,
    /// Date the edition was archived.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archived: Option<Date>,
}
