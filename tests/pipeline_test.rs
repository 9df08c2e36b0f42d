//! End-to-end conversion tests over the bundled article fixtures.
//!
//! These exercise the whole forward pipeline (parse, retarget, synthesize,
//! reference table, assemble, resolve) against known documents, including
//! the citation-numbering scenario with a fixed expected assignment.

use webstract::model::plain_text;
use webstract::{
    Block, ConversionConfig, Document, Inline, PlainFormatter, convert_file, convert_str,
    rendered_references,
};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> String {
    format!("{}/{}", FIXTURES_DIR, name)
}

fn convert_fixture(name: &str) -> webstract::Conversion {
    convert_file(fixture_path(name), &ConversionConfig::default())
        .unwrap_or_else(|e| panic!("failed to convert {name}: {e}"))
}

fn reference_keys(doc: &Document) -> Vec<&str> {
    doc.references.iter().map(|r| r.key.as_str()).collect()
}

/// Collect (keys, labels) for every citation in document order.
fn citations(doc: &Document) -> Vec<(Vec<String>, Vec<u32>)> {
    fn walk_run(run: &[Inline], out: &mut Vec<(Vec<String>, Vec<u32>)>) {
        for node in run {
            match node {
                Inline::CiteRef { keys, labels } => out.push((keys.clone(), labels.clone())),
                Inline::Emphasis(inner)
                | Inline::Bold(inner)
                | Inline::Code(inner)
                | Inline::CrossRef { content: inner, .. }
                | Inline::Link { content: inner, .. } => walk_run(inner, out),
                _ => {}
            }
        }
    }
    fn walk_blocks(blocks: &[Block], out: &mut Vec<(Vec<String>, Vec<u32>)>) {
        for block in blocks {
            match block {
                Block::Paragraph(run) | Block::Preformat(run) => walk_run(run, out),
                Block::List(list) => {
                    for item in &list.items {
                        walk_blocks(&item.blocks, out);
                    }
                }
                Block::DefList(def_list) => {
                    for item in &def_list.items {
                        walk_run(&item.term, out);
                        for def in &item.defs {
                            walk_blocks(&def.blocks, out);
                        }
                    }
                }
                Block::Quote(blocks) => walk_blocks(blocks, out),
                Block::Table(table) => {
                    for row in table.head.iter().chain(table.body.iter()) {
                        for cell in &row.cells {
                            walk_run(&cell.content, out);
                        }
                    }
                }
                Block::Figure(figure) => walk_run(&figure.caption, out),
            }
        }
    }
    let mut out = Vec::new();
    walk_blocks(&doc.body.blocks, &mut out);
    for section in sections_flat(&doc.body.sections) {
        walk_blocks(&section.blocks, &mut out);
    }
    out
}

fn sections_flat(sections: &[webstract::Section]) -> Vec<&webstract::Section> {
    let mut out = Vec::new();
    fn walk<'a>(sections: &'a [webstract::Section], out: &mut Vec<&'a webstract::Section>) {
        for section in sections {
            out.push(section);
            walk(&section.sections, out);
        }
    }
    walk(sections, &mut out);
    out
}

// ============================================================================
// Known numbering scenario
// ============================================================================

#[test]
fn test_dsi_article_number_assignments() {
    let conversion = convert_fixture("dsi_article.xml");
    let doc = &conversion.document;

    // Body citation order is doi, git, DSI_spec, intrinsic, DSI_spec,
    // what_is_baseprint, DSI_spec, git, doi; the rendered numbers agree
    // with the reference list's own order, which therefore wins.
    assert_eq!(
        reference_keys(doc),
        vec![
            "ref-enwikiU003Agit",
            "ref-enwikiU003Adoi",
            "ref-DSI_spec",
            "ref-intrinsic_extrinsic_identifiers",
            "ref-what_is_baseprint",
        ]
    );

    let labels: Vec<Vec<u32>> = citations(doc).into_iter().map(|(_, l)| l).collect();
    assert_eq!(
        labels,
        vec![
            vec![2],
            vec![1],
            vec![3],
            vec![4],
            vec![3],
            vec![5],
            vec![3],
            vec![1],
            vec![2],
        ]
    );
    assert!(conversion.issues.is_empty(), "{:?}", conversion.issues);
}

#[test]
fn test_dsi_article_front_matter() {
    let doc = convert_fixture("dsi_article.xml").document;
    assert_eq!(
        plain_text(&doc.title),
        "What is a Digital Succession Identifier?"
    );
    assert_eq!(doc.contributors.len(), 1);
    let author = &doc.contributors[0];
    assert_eq!(author.surname.as_deref(), Some("Ellerman"));
    assert_eq!(
        author.orcid.as_ref().map(|o| o.as_url()),
        Some("https://orcid.org/0000-0002-1825-0097".into())
    );
    assert_eq!(
        doc.edition.as_ref().and_then(|e| e.succession.as_deref()),
        Some("1wFGhvmv8XY6GJivFq2jMhEGK6k")
    );
}

#[test]
fn test_dsi_article_rendered_references() {
    let doc = convert_fixture("dsi_article.xml").document;
    let rendered = rendered_references(&doc, &PlainFormatter);
    assert_eq!(rendered.len(), 5);
    assert_eq!(
        rendered.iter().map(|(n, _)| *n).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert!(rendered[0].1.contains("Git"));
    assert!(rendered[2].1.contains("Digital Succession Identifier Specification"));
    assert!(rendered.iter().all(|(_, text)| !text.is_empty()));
}

// ============================================================================
// HTML-flavored input
// ============================================================================

#[test]
fn test_html_flavored_retargets_lists() {
    let doc = convert_fixture("html_flavored.xml").document;

    let kinds: Vec<&str> = doc
        .body
        .blocks
        .iter()
        .map(|b| match b {
            Block::Paragraph(_) => "p",
            Block::List(_) => "list",
            Block::DefList(_) => "def-list",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["p", "list", "def-list"]);

    let Block::List(list) = &doc.body.blocks[1] else {
        panic!("expected list");
    };
    assert_eq!(list.kind, webstract::model::ListKind::Order);
    assert_eq!(list.items.len(), 2);

    let Block::DefList(def_list) = &doc.body.blocks[2] else {
        panic!("expected def-list");
    };
    assert_eq!(def_list.items.len(), 2);
    assert_eq!(plain_text(&def_list.items[0].term), "snapshot");
    // The bare <pre> under the second <dd> came out paragraph-wrapped with
    // its content intact.
    let example = &def_list.items[1].defs[0].blocks[0];
    assert!(matches!(example, Block::Paragraph(run)
        if plain_text(run) == "dsi:1wFGhvmv8XY6GJivFq2jMhEGK6k"));
}

#[test]
fn test_html_flavored_line_break_survives() {
    let doc = convert_fixture("html_flavored.xml").document;
    let Block::Paragraph(run) = &doc.body.blocks[0] else {
        panic!("expected paragraph");
    };
    assert!(run.iter().any(|n| matches!(n, Inline::Break)));
}

#[test]
fn test_html_flavored_citations_and_cross_refs() {
    let conversion = convert_fixture("html_flavored.xml");
    let doc = &conversion.document;
    assert_eq!(reference_keys(doc), vec!["ref-tool", "ref-manual"]);
    let cites = citations(doc);
    assert_eq!(cites.len(), 2);
    assert_eq!(cites[0].1, vec![1]);
    assert_eq!(cites[1].1, vec![2]);

    // The mixed citation kept its visible text.
    assert_eq!(
        doc.references[1].raw.as_deref(),
        Some("Example Project. The missing manual. 2022.")
    );
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_unresolved_citation_is_fatal() {
    let err = convert_str(
        concat!(
            "<article><body><p><xref rid=\"ref-missing\" ref-type=\"bibr\"/></p></body>",
            "<back><ref-list><ref id=\"ref-real\"><element-citation/></ref></ref-list></back>",
            "</article>"
        ),
        &ConversionConfig::default(),
    )
    .unwrap_err();
    match err {
        webstract::Error::UnresolvedCitation { key, .. } => assert_eq!(key, "ref-missing"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_duplicate_reference_key_is_fatal() {
    let err = convert_str(
        concat!(
            "<article><body/>",
            "<back><ref-list>",
            "<ref id=\"r\"><element-citation/></ref>",
            "<ref id=\"r\"><element-citation/></ref>",
            "</ref-list></back></article>"
        ),
        &ConversionConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, webstract::Error::DuplicateKey(_)));
}

#[test]
fn test_collapse_of_three_first_time_citations() {
    let conversion = convert_str(
        concat!(
            "<article><body><p>",
            "<xref rid=\"a\" ref-type=\"bibr\"/>, ",
            "<xref rid=\"b\" ref-type=\"bibr\"/>, ",
            "<xref rid=\"c\" ref-type=\"bibr\"/></p></body>",
            "<back><ref-list>",
            "<ref id=\"a\"><element-citation/></ref>",
            "<ref id=\"b\"><element-citation/></ref>",
            "<ref id=\"c\"><element-citation/></ref>",
            "</ref-list></back></article>"
        ),
        &ConversionConfig::default(),
    )
    .unwrap();
    let cites = citations(&conversion.document);
    assert_eq!(cites.len(), 1, "adjacent citations should collapse");
    assert_eq!(cites[0].1, vec![1, 2, 3]);
}
