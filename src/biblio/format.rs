//! Bibliography rendering seam.
//!
//! The presentation stage needs each reference as `(number, text)` pairs
//! in citation order. Formatting itself is pluggable: CSL-style engines
//! implement [`BiblioFormatter`] behind this trait, and the crate ships a
//! plain deterministic formatter for tests and the CLI.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::model::{BibItem, Document, RefAuthor};

/// Characters that must be escaped when a DOI is embedded in a URL path.
const DOI_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'%')
    .add(b'?');

/// Resolver URL for a DOI ("10.1000/xyz" -> "https://doi.org/10.1000/xyz").
pub fn doi_url(doi: &str) -> String {
    format!("https://doi.org/{}", utf8_percent_encode(doi, DOI_ESCAPES))
}

/// Formats one bibliography entry to display text.
///
/// Implementations must be pure: the resolver has already fixed the order
/// and numbering, so a formatter only ever sees one item at a time.
pub trait BiblioFormatter {
    fn format(&self, item: &BibItem) -> String;
}

/// Minimal built-in formatter: "authors. title. container year;volume(issue):pages. doi".
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainFormatter;

impl BiblioFormatter for PlainFormatter {
    fn format(&self, item: &BibItem) -> String {
        let mut parts: Vec<String> = Vec::new();

        let authors: Vec<String> = item.authors.iter().map(author_text).collect();
        if !authors.is_empty() {
            parts.push(format!("{}.", authors.join(", ")));
        }
        if let Some(title) = &item.title {
            parts.push(format!("{}.", title.trim_end_matches('.')));
        }
        if let Some(container) = &item.container_title {
            let mut cite = container.clone();
            if let Some(year) = item.year {
                cite.push_str(&format!(" {year}"));
            }
            if let Some(volume) = &item.volume {
                cite.push_str(&format!(";{volume}"));
                if let Some(issue) = &item.issue {
                    cite.push_str(&format!("({issue})"));
                }
            }
            if let Some(pages) = &item.pages {
                cite.push_str(&format!(":{pages}"));
            }
            parts.push(format!("{cite}."));
        } else if let Some(year) = item.year {
            parts.push(format!("{year}."));
        }
        if let Some(doi) = &item.doi {
            parts.push(doi_url(doi));
        } else if let Some(url) = &item.url {
            parts.push(url.clone());
        }

        if parts.is_empty() {
            // Mixed citations without structured fields fall back to raw text.
            return item.raw.clone().unwrap_or_default();
        }
        parts.join(" ")
    }
}

fn author_text(author: &RefAuthor) -> String {
    match author {
        RefAuthor::Name {
            surname,
            given_names,
        } => match (surname, given_names) {
            (Some(s), Some(g)) => format!("{s} {}", initials(g)),
            (Some(s), None) => s.clone(),
            (None, Some(g)) => g.clone(),
            (None, None) => String::new(),
        },
        RefAuthor::Collab(name) => name.clone(),
    }
}

fn initials(given_names: &str) -> String {
    given_names
        .split_whitespace()
        .filter_map(|word| word.chars().next())
        .collect()
}

/// Ordered `(number, formatted text)` pairs for the presentation stage.
///
/// The document's reference list is already in ascending citation-number
/// order after resolution, so numbering is positional.
pub fn rendered_references(doc: &Document, formatter: &dyn BiblioFormatter) -> Vec<(u32, String)> {
    doc.references
        .iter()
        .enumerate()
        .map(|(i, item)| (i as u32 + 1, formatter.format(item)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> BibItem {
        BibItem {
            key: "r1".into(),
            authors: vec![
                RefAuthor::Name {
                    surname: Some("Hartl".into()),
                    given_names: Some("Daniel L.".into()),
                },
                RefAuthor::Collab("The Consortium".into()),
            ],
            title: Some("Essential genetics".into()),
            container_title: Some("Journal of Things".into()),
            year: Some(2006),
            volume: Some("11".into()),
            issue: Some("2".into()),
            pages: Some("100-110".into()),
            doi: Some("10.1000/xyz".into()),
            ..BibItem::default()
        }
    }

    #[test]
    fn test_plain_formatter_full_record() {
        let text = PlainFormatter.format(&sample_item());
        assert_eq!(
            text,
            "Hartl DL, The Consortium. Essential genetics. Journal of Things 2006;11(2):100-110. https://doi.org/10.1000/xyz"
        );
    }

    #[test]
    fn test_doi_url_escapes_reserved_characters() {
        assert_eq!(doi_url("10.1000/xyz"), "https://doi.org/10.1000/xyz");
        assert_eq!(
            doi_url("10.1000/a<b>#c"),
            "https://doi.org/10.1000/a%3Cb%3E%23c"
        );
    }

    #[test]
    fn test_plain_formatter_falls_back_to_raw() {
        let item = BibItem {
            key: "r2".into(),
            raw: Some("Smith J. A thing, 2019.".into()),
            ..BibItem::default()
        };
        assert_eq!(PlainFormatter.format(&item), "Smith J. A thing, 2019.");
    }
}
