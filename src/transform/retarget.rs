//! Retarget HTML-shaped elements to JATS equivalents.
//!
//! Upstream HTML-to-JATS transforms leave HTML element names behind
//! (`ol`/`ul`/`li`, `dl`/`dt`/`dd`, `br`) and place block content where
//! JATS forbids it. This pass rewrites those subtrees so the rest of the
//! pipeline only ever sees JATS-legal names in JATS-legal positions:
//!
//! 1. **Rename** (top-down, so a `dd` becomes `def` before its children
//!    are inspected): `br`→`break`, `ol`→`list[@list-type=order]`,
//!    `ul`→`list[@list-type=bullet]`, `li`→`list-item`, `dl`→`def-list`,
//!    `dt`→`term`, `dd`→`def`, and a `div` grouping term/def pairs inside
//!    a `def-list` becomes `def-item`.
//! 2. **Group**: bare `term`/`def` runs that are direct children of a
//!    `def-list` are wrapped in synthetic `def-item` elements, one per
//!    term with its following definitions.
//! 3. **Wrap** (bottom-up, against the already-renamed parent): block
//!    content that is illegal as a direct child of `list-item` or `def`
//!    (code blocks, block quotes, preformatted text, nested lists) is
//!    wrapped in a synthetic `p`.
//!
//! Elements with no matching rule pass through unchanged, attributes
//! preserved verbatim. Malformed nesting (a `li` outside any list) is not
//! repaired and fails with a structure error. Applying the pass to an
//! already-retargeted tree is a no-op.

use crate::error::{Error, Result};
use crate::issue::{IssueKind, IssueLog};
use crate::xml::{NodeId, XmlTree};

/// Block elements that must be `p`-wrapped inside `list-item` and `def`.
const WRAP_IN_PARAGRAPH: &[&str] = &[
    "code",
    "preformat",
    "pre",
    "disp-quote",
    "blockquote",
    "list",
    "def-list",
];

/// Run the full retargeting pass over the tree.
pub fn retarget(tree: &mut XmlTree, issues: &mut IssueLog) -> Result<()> {
    let Some(root) = tree.root_element() else {
        return Ok(());
    };
    rename_pass(tree, root)?;
    group_pass(tree, root, issues)?;
    wrap_pass(tree, root);
    Ok(())
}

/// Top-down rename of HTML-shaped element names.
fn rename_pass(tree: &mut XmlTree, id: NodeId) -> Result<()> {
    if let Some(name) = tree.name(id) {
        match name {
            "br" => {
                if tree.node(id).first_child.is_some() {
                    return Err(Error::Structure("<br> must be empty".into()));
                }
                tree.rename(id, "break");
            }
            "ol" => {
                tree.rename(id, "list");
                tree.set_attr(id, "list-type", "order");
            }
            "ul" => {
                tree.rename(id, "list");
                tree.set_attr(id, "list-type", "bullet");
            }
            "li" => {
                if tree.parent_name(id) != Some("list") {
                    return Err(Error::bad_parent("li", tree.parent_name(id)));
                }
                tree.rename(id, "list-item");
            }
            "dl" => tree.rename(id, "def-list"),
            "div" if tree.parent_name(id) == Some("def-list") => {
                tree.rename(id, "def-item");
            }
            "dt" => {
                if !matches!(tree.parent_name(id), Some("def-list") | Some("def-item")) {
                    return Err(Error::bad_parent("dt", tree.parent_name(id)));
                }
                tree.rename(id, "term");
            }
            "dd" => {
                if !matches!(tree.parent_name(id), Some("def-list") | Some("def-item")) {
                    return Err(Error::bad_parent("dd", tree.parent_name(id)));
                }
                tree.rename(id, "def");
            }
            _ => {}
        }
    }
    let children: Vec<NodeId> = tree.children(id).collect();
    for child in children {
        rename_pass(tree, child)?;
    }
    Ok(())
}

/// Group bare term/def runs under a `def-list` into `def-item` wrappers.
fn group_pass(tree: &mut XmlTree, id: NodeId, issues: &mut IssueLog) -> Result<()> {
    let children: Vec<NodeId> = tree.children(id).collect();
    for child in children {
        group_pass(tree, child, issues)?;
    }
    if tree.name(id) == Some("def-list") {
        group_def_items(tree, id, issues)?;
    }
    Ok(())
}

fn group_def_items(tree: &mut XmlTree, def_list: NodeId, issues: &mut IssueLog) -> Result<()> {
    let children: Vec<NodeId> = tree.children(def_list).collect();
    let needs_grouping = children
        .iter()
        .any(|&c| matches!(tree.name(c), Some("term") | Some("def")));
    if !needs_grouping {
        return Ok(());
    }

    let mut new_children: Vec<NodeId> = Vec::new();
    let mut current_item: Option<NodeId> = None;
    for child in children {
        match tree.name(child) {
            Some("term") => {
                let item = tree.alloc_element("def-item");
                tree.adopt(item, child);
                new_children.push(item);
                current_item = Some(item);
            }
            Some("def") => match current_item {
                Some(item) => tree.adopt(item, child),
                None => {
                    return Err(Error::Structure(
                        "<def> without a preceding <term> in <def-list>".into(),
                    ));
                }
            },
            Some(_) => {
                // Already-grouped def-item (or a title) keeps its place.
                new_children.push(child);
                current_item = None;
            }
            None => {
                let blank = tree.text(child).is_none_or(|t| t.trim().is_empty());
                if !blank {
                    issues.record_at(
                        IssueKind::IgnoredText {
                            parent: "def-list".into(),
                        },
                        tree.node(def_list).line,
                    );
                }
                // Whitespace between groups carries no content.
            }
        }
    }
    tree.relink_children(def_list, &new_children);
    Ok(())
}

/// Bottom-up wrapping of illegal block children of `list-item` and `def`.
fn wrap_pass(tree: &mut XmlTree, id: NodeId) {
    let children: Vec<NodeId> = tree.children(id).collect();
    for child in children {
        wrap_pass(tree, child);
    }
    if matches!(tree.name(id), Some("list-item") | Some("def")) {
        wrap_block_children(tree, id);
    }
}

fn wrap_block_children(tree: &mut XmlTree, parent: NodeId) {
    let children: Vec<NodeId> = tree.children(parent).collect();
    if !children.iter().any(|&c| needs_wrap(tree, c)) {
        return;
    }
    let mut new_children: Vec<NodeId> = Vec::with_capacity(children.len());
    for child in children {
        if needs_wrap(tree, child) {
            let p = tree.alloc_element("p");
            tree.adopt(p, child);
            new_children.push(p);
        } else {
            new_children.push(child);
        }
    }
    tree.relink_children(parent, &new_children);
}

fn needs_wrap(tree: &XmlTree, id: NodeId) -> bool {
    matches!(tree.name(id), Some(name) if WRAP_IN_PARAGRAPH.contains(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueLog;
    use crate::xml::{parse_str, write_str};

    fn run(src: &str) -> String {
        let mut tree = parse_str(src).unwrap();
        let mut issues = IssueLog::new();
        retarget(&mut tree, &mut issues).unwrap();
        write_str(&tree)
    }

    #[test]
    fn test_renames_ordered_and_unordered_lists() {
        assert_eq!(
            run("<body><ol><li><p>a</p></li></ol></body>"),
            "<body><list list-type=\"order\"><list-item><p>a</p></list-item></list></body>"
        );
        assert_eq!(
            run("<body><ul><li><p>a</p></li></ul></body>"),
            "<body><list list-type=\"bullet\"><list-item><p>a</p></list-item></list></body>"
        );
    }

    #[test]
    fn test_br_becomes_self_closing_break() {
        assert_eq!(run("<p>one<br/>two</p>"), "<p>one<break/>two</p>");
    }

    #[test]
    fn test_definition_list_grouping() {
        assert_eq!(
            run("<body><dl><dt>k</dt><dd><p>v</p></dd></dl></body>"),
            "<body><def-list><def-item><term>k</term><def><p>v</p></def></def-item></def-list></body>"
        );
    }

    #[test]
    fn test_div_group_becomes_def_item() {
        assert_eq!(
            run("<body><dl><div><dt>k</dt><dd><p>v</p></dd></div></dl></body>"),
            "<body><def-list><def-item><term>k</term><def><p>v</p></def></def-item></def-list></body>"
        );
    }

    #[test]
    fn test_multiple_defs_share_term() {
        assert_eq!(
            run("<body><dl><dt>k</dt><dd><p>a</p></dd><dd><p>b</p></dd></dl></body>"),
            "<body><def-list><def-item><term>k</term><def><p>a</p></def><def><p>b</p></def></def-item></def-list></body>"
        );
    }

    #[test]
    fn test_preformatted_in_def_gets_paragraph_wrapped() {
        assert_eq!(
            run("<body><dl><dt>k</dt><dd><pre>x = 1</pre></dd></dl></body>"),
            "<body><def-list><def-item><term>k</term><def><p><pre>x = 1</pre></p></def></def-item></def-list></body>"
        );
    }

    #[test]
    fn test_nested_list_in_list_item_gets_wrapped() {
        let expect = concat!(
            "<body><list list-type=\"bullet\"><list-item>",
            "<p><list list-type=\"order\"><list-item><p>x</p></list-item></list></p>",
            "</list-item></list></body>"
        );
        assert_eq!(
            run("<body><ul><li><ol><li><p>x</p></li></ol></li></ul></body>"),
            expect
        );
    }

    #[test]
    fn test_li_outside_list_is_structure_error() {
        let mut tree = parse_str("<body><li>loose</li></body>").unwrap();
        let mut issues = IssueLog::new();
        let err = retarget(&mut tree, &mut issues).unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
    }

    #[test]
    fn test_def_without_term_is_structure_error() {
        let mut tree = parse_str("<body><dl><dd><p>orphan</p></dd></dl></body>").unwrap();
        let mut issues = IssueLog::new();
        assert!(retarget(&mut tree, &mut issues).is_err());
    }

    #[test]
    fn test_pure_jats_is_untouched() {
        let src = "<body><list list-type=\"order\"><list-item><p>a</p></list-item></list>\
                   <def-list><def-item><term>t</term><def><p>d</p></def></def-item></def-list></body>";
        let mut tree = parse_str(src).unwrap();
        let mut issues = IssueLog::new();
        retarget(&mut tree, &mut issues).unwrap();
        assert_eq!(write_str(&tree), src);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_idempotent_on_own_output() {
        let first = run("<body><ol><li><pre>x</pre></li></ol></body>");
        assert_eq!(run(&first), first);
    }
}
