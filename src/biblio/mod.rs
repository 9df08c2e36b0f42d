//! Reference table construction from the JATS `ref-list`.
//!
//! Each `<ref id=K>` holds its citation payload under either
//! `<element-citation>` (structured fields) or `<mixed-citation>`
//! (semi-structured free text with embedded tags). Both are normalized
//! into the same [`BibItem`] record shape; mixed citations keep their
//! visible text as a `raw` fallback while still yielding any nested
//! structured fields.
//!
//! Keys must be unique: a duplicate `ref/@id` is fatal, because citation
//! numbering downstream depends on unambiguous key lookup.

mod format;

pub use format::{BiblioFormatter, PlainFormatter, doi_url, rendered_references};

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::issue::{IssueKind, IssueLog};
use crate::model::{BibItem, Date, RefAuthor};
use crate::xml::{NodeId, XmlTree};

/// Reference lookup table preserving document order.
#[derive(Debug, Default)]
pub struct RefTable {
    items: Vec<BibItem>,
    index: HashMap<String, usize>,
}

impl RefTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// All items in original document order.
    pub fn items(&self) -> &[BibItem] {
        &self.items
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&BibItem> {
        self.index.get(key).map(|&i| &self.items[i])
    }

    /// Zero-based position of a key in original document order.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn insert(&mut self, item: BibItem) -> Result<()> {
        if self.index.contains_key(&item.key) {
            return Err(Error::DuplicateKey(item.key));
        }
        self.index.insert(item.key.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }
}

/// Build the reference table from the document's `ref-list`, if any.
pub fn build_ref_table(tree: &XmlTree, issues: &mut IssueLog) -> Result<RefTable> {
    let mut table = RefTable::new();
    let Some(root) = tree.root_element() else {
        return Ok(table);
    };
    let Some(ref_list) = tree.find_descendant(root, "ref-list") else {
        return Ok(table);
    };
    for child in tree.children(ref_list) {
        match tree.name(child) {
            Some("ref") => table.insert(parse_ref(tree, child, issues)?)?,
            Some("title") | None => {}
            Some(tag) => issues.record_at(
                IssueKind::UnsupportedElement {
                    tag: tag.to_string(),
                    parent: Some("ref-list".into()),
                },
                tree.node(child).line,
            ),
        }
    }
    Ok(table)
}

/// Parse one `<ref>` into a [`BibItem`].
fn parse_ref(tree: &XmlTree, ref_node: NodeId, issues: &mut IssueLog) -> Result<BibItem> {
    let key = tree
        .attr(ref_node, "id")
        .map(str::to_string)
        .ok_or_else(|| Error::Structure("<ref> missing id attribute".into()))?;

    let mut item = BibItem {
        key: key.clone(),
        ..BibItem::default()
    };

    if let Some(citation) = tree.find_child(ref_node, "element-citation") {
        parse_element_citation(tree, citation, &mut item, issues);
    } else if let Some(citation) = tree.find_child(ref_node, "mixed-citation") {
        parse_mixed_citation(tree, citation, &mut item, issues);
    } else {
        return Err(Error::Structure(format!(
            "<ref id=\"{key}\"> has neither element-citation nor mixed-citation"
        )));
    }
    Ok(item)
}

fn parse_element_citation(
    tree: &XmlTree,
    citation: NodeId,
    item: &mut BibItem,
    issues: &mut IssueLog,
) {
    if let Some(kind) = tree.attr(citation, "publication-type") {
        item.publication_type = Some(kind.to_string());
    }
    let mut fpage: Option<String> = None;
    let mut lpage: Option<String> = None;

    for child in tree.children(citation) {
        let Some(tag) = tree.name(child) else {
            continue;
        };
        match tag {
            "person-group" => parse_person_group(tree, child, item, issues),
            "article-title" => item.title = nonempty(tree.text_content(child)),
            "source" => item.container_title = nonempty(tree.text_content(child)),
            "year" => item.year = parse_int(tree, child, issues),
            "month" => {
                item.month = parse_int(tree, child, issues)
                    .filter(|&m| (1..=12).contains(&m))
                    .map(|m| m as u32);
            }
            "volume" => item.volume = nonempty(tree.text_content(child)),
            "issue" => item.issue = nonempty(tree.text_content(child)),
            "fpage" => fpage = nonempty(tree.text_content(child)),
            "lpage" => lpage = nonempty(tree.text_content(child)),
            "pub-id" => parse_pub_id(tree, child, item, issues),
            "uri" => {
                if item.url.is_none() {
                    item.url = nonempty(tree.text_content(child));
                }
            }
            "ext-link" => {
                if item.url.is_none() {
                    item.url = tree
                        .attr(child, "xlink:href")
                        .map(str::to_string)
                        .or_else(|| nonempty(tree.text_content(child)));
                }
            }
            "date-in-citation" => {
                if tree.attr(child, "content-type") == Some("access-date") {
                    item.accessed = parse_date(tree, child, issues);
                }
            }
            "edition" => item.edition = parse_edition(tree, child, issues),
            "publisher-name" => item.publisher = nonempty(tree.text_content(child)),
            "publisher-loc" => item.publisher_loc = nonempty(tree.text_content(child)),
            "isbn" => item.isbn = nonempty(tree.text_content(child)),
            "issn" => item.issn = nonempty(tree.text_content(child)),
            "day" | "label" => {}
            other => issues.record_at(
                IssueKind::UnsupportedElement {
                    tag: other.to_string(),
                    parent: Some("element-citation".into()),
                },
                tree.node(child).line,
            ),
        }
    }

    item.pages = match (fpage, lpage) {
        (Some(first), Some(last)) => Some(format!("{first}-{last}")),
        (Some(first), None) => Some(first),
        (None, _) => None,
    };
}

/// Mixed citations keep their visible text; nested structured fields are
/// still extracted when present.
fn parse_mixed_citation(
    tree: &XmlTree,
    citation: NodeId,
    item: &mut BibItem,
    issues: &mut IssueLog,
) {
    item.raw = nonempty(normalize_ws(&tree.text_content(citation)));
    if let Some(title) = tree.find_descendant(citation, "article-title") {
        item.title = nonempty(tree.text_content(title));
    }
    if let Some(year) = tree.find_descendant(citation, "year") {
        item.year = parse_int(tree, year, issues);
    }
    if let Some(uri) = tree.find_descendant(citation, "uri") {
        item.url = nonempty(tree.text_content(uri));
    }
}

fn parse_person_group(tree: &XmlTree, group: NodeId, item: &mut BibItem, issues: &mut IssueLog) {
    let group_type = tree.attr(group, "person-group-type").unwrap_or("author");
    if group_type != "author" {
        issues.record_at(
            IssueKind::UnsupportedAttributeValue {
                tag: "person-group".into(),
                attribute: "person-group-type".into(),
                value: group_type.to_string(),
            },
            tree.node(group).line,
        );
        return;
    }
    for child in tree.children(group) {
        match tree.name(child) {
            Some("name") => {
                let surname = tree
                    .find_child(child, "surname")
                    .map(|n| tree.text_content(n));
                let given_names = tree
                    .find_child(child, "given-names")
                    .map(|n| tree.text_content(n));
                if surname.is_none() && given_names.is_none() {
                    issues.record_at(
                        IssueKind::MissingContent { tag: "name".into() },
                        tree.node(child).line,
                    );
                    continue;
                }
                item.authors.push(RefAuthor::Name {
                    surname,
                    given_names,
                });
            }
            Some("string-name") | Some("collab") => {
                if let Some(text) = nonempty(tree.text_content(child)) {
                    item.authors.push(RefAuthor::Collab(text));
                }
            }
            Some(tag) => issues.record_at(
                IssueKind::UnsupportedElement {
                    tag: tag.to_string(),
                    parent: Some("person-group".into()),
                },
                tree.node(child).line,
            ),
            None => {}
        }
    }
}

fn parse_pub_id(tree: &XmlTree, pub_id: NodeId, item: &mut BibItem, issues: &mut IssueLog) {
    let value = tree.text_content(pub_id);
    let value = value.trim();
    match tree.attr(pub_id, "pub-id-type") {
        Some("doi") => {
            // DOIs begin with the "10." directory indicator; tolerate the
            // resolver-URL form by stripping its prefix.
            let value = value.strip_prefix("https://doi.org/").unwrap_or(value);
            if value.starts_with("10.") {
                if item.doi.is_some() {
                    issues.record_at(
                        IssueKind::ExcessElement {
                            tag: "pub-id".into(),
                        },
                        tree.node(pub_id).line,
                    );
                } else {
                    item.doi = Some(value.to_string());
                }
            } else {
                issues.record_at(
                    IssueKind::InvalidDoi {
                        value: value.to_string(),
                    },
                    tree.node(pub_id).line,
                );
            }
        }
        Some("pmid") => {
            if value.chars().all(|c| c.is_ascii_digit()) && !value.is_empty() {
                item.pmid = Some(value.to_string());
            } else {
                issues.record_at(
                    IssueKind::InvalidPmid {
                        value: value.to_string(),
                    },
                    tree.node(pub_id).line,
                );
            }
        }
        Some(other) => issues.record_at(
            IssueKind::UnsupportedAttributeValue {
                tag: "pub-id".into(),
                attribute: "pub-id-type".into(),
                value: other.to_string(),
            },
            tree.node(pub_id).line,
        ),
        None => issues.record_at(
            IssueKind::UnsupportedElement {
                tag: "pub-id".into(),
                parent: Some("element-citation".into()),
            },
            tree.node(pub_id).line,
        ),
    }
}

fn parse_date(tree: &XmlTree, node: NodeId, issues: &mut IssueLog) -> Option<Date> {
    let year = tree.find_child(node, "year")?;
    let year = parse_int(tree, year, issues)?;
    let mut date = Date::year(year);
    if let Some(month) = tree.find_child(node, "month")
        && let Some(m) = parse_int(tree, month, issues).filter(|&m| (1..=12).contains(&m))
    {
        date.month = Some(m as u32);
        if let Some(day) = tree.find_child(node, "day")
            && let Some(d) = parse_int(tree, day, issues).filter(|&d| (1..=31).contains(&d))
        {
            date.day = Some(d as u32);
        }
    }
    Some(date)
}

/// Parse integer element content, reporting malformed values as issues.
fn parse_int(tree: &XmlTree, node: NodeId, issues: &mut IssueLog) -> Option<i32> {
    let text = tree.text_content(node);
    let text = text.trim();
    match text.parse::<i32>() {
        Ok(value) => Some(value),
        Err(_) => {
            issues.record_at(
                IssueKind::InvalidInteger {
                    tag: tree.name(node).unwrap_or("?").to_string(),
                    value: text.to_string(),
                },
                tree.node(node).line,
            );
            None
        }
    }
}

/// Parse edition strings like "4th ed." down to their ordinal number.
fn parse_edition(tree: &XmlTree, node: NodeId, issues: &mut IssueLog) -> Option<u32> {
    let raw = tree.text_content(node);
    let mut text = raw.trim();
    text = text.strip_suffix('.').unwrap_or(text).trim_end();
    for suffix in [" Ed", " ed"] {
        text = text.strip_suffix(suffix).unwrap_or(text);
    }
    for suffix in ["st", "nd", "rd", "th"] {
        if let Some(stripped) = text.strip_suffix(suffix)
            && stripped.chars().all(|c| c.is_ascii_digit())
            && !stripped.is_empty()
        {
            text = stripped;
            break;
        }
    }
    match text.parse::<u32>() {
        Ok(value) => Some(value),
        Err(_) => {
            issues.record_at(
                IssueKind::InvalidInteger {
                    tag: "edition".into(),
                    value: raw.trim().to_string(),
                },
                tree.node(node).line,
            );
            None
        }
    }
}

fn nonempty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == s.len() {
        Some(s)
    } else {
        Some(trimmed.to_string())
    }
}

/// Collapse internal whitespace runs and trim the ends.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
