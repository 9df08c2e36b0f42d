//! Fill required-but-absent front matter with deterministic placeholders.
//!
//! Baseprints frequently omit journal-level metadata that downstream JATS
//! consumers require. This pass inserts fixed placeholder content for
//! `front/journal-meta`, `front/article-meta/article-categories`,
//! `front/article-meta/pub-date`, and `front/article-meta/elocation-id`
//! when they are entirely absent. Existing metadata is never overwritten,
//! so the pass is idempotent and safe on already-complete input.

use crate::error::{Error, Result};
use crate::xml::{NodeId, XmlTree};

/// Ensure minimum front-matter structure, inserting placeholders as needed.
pub fn synthesize_metadata(tree: &mut XmlTree) -> Result<()> {
    let article = tree
        .root_element()
        .ok_or_else(|| Error::MissingElement("article".into()))?;

    let front = match tree.find_child(article, "front") {
        Some(front) => front,
        None => {
            let front = tree.alloc_element("front");
            let mut children: Vec<NodeId> = vec![front];
            children.extend(tree.children(article));
            tree.relink_children(article, &children);
            front
        }
    };

    if tree.find_child(front, "journal-meta").is_none() {
        let journal_meta = placeholder_journal_meta(tree);
        let mut children: Vec<NodeId> = vec![journal_meta];
        children.extend(tree.children(front));
        tree.relink_children(front, &children);
    }

    let article_meta = match tree.find_child(front, "article-meta") {
        Some(meta) => meta,
        None => {
            let meta = tree.alloc_element("article-meta");
            tree.append_child(front, meta);
            meta
        }
    };

    if tree.find_child(article_meta, "article-categories").is_none() {
        let categories = placeholder_categories(tree);
        tree.append_child(article_meta, categories);
    }
    if tree.find_child(article_meta, "pub-date").is_none() {
        let pub_date = placeholder_pub_date(tree);
        tree.append_child(article_meta, pub_date);
    }
    if tree.find_child(article_meta, "elocation-id").is_none() {
        let elocation = tree.alloc_element("elocation-id");
        let text = tree.alloc_text("e1");
        tree.append_child(elocation, text);
        tree.append_child(article_meta, elocation);
    }

    Ok(())
}

fn placeholder_journal_meta(tree: &mut XmlTree) -> NodeId {
    let journal_meta = tree.alloc_element("journal-meta");
    let journal_id = tree.alloc_element("journal-id");
    tree.set_attr(journal_id, "journal-id-type", "publisher-id");
    let text = tree.alloc_text("unknown");
    tree.append_child(journal_id, text);
    tree.append_child(journal_meta, journal_id);
    journal_meta
}

fn placeholder_categories(tree: &mut XmlTree) -> NodeId {
    let categories = tree.alloc_element("article-categories");
    let group = tree.alloc_element("subj-group");
    tree.set_attr(group, "subj-group-type", "heading");
    let subject = tree.alloc_element("subject");
    let text = tree.alloc_text("Other");
    tree.append_child(subject, text);
    tree.append_child(group, subject);
    tree.append_child(categories, group);
    categories
}

fn placeholder_pub_date(tree: &mut XmlTree) -> NodeId {
    let pub_date = tree.alloc_element("pub-date");
    tree.set_attr(pub_date, "date-type", "pub");
    tree.set_attr(pub_date, "publication-format", "electronic");
    let year = tree.alloc_element("year");
    let text = tree.alloc_text("1970");
    tree.append_child(year, text);
    tree.append_child(pub_date, year);
    pub_date
}
