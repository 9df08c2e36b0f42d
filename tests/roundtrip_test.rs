//! Round-trip tests: JSON interchange and JATS re-export.
//!
//! The JSON round-trip law is the hard correctness requirement: for every
//! document the assembler produces, deserialize(serialize(d)) == d. The
//! JATS re-export check closes the larger loop: converting a baseprint,
//! exporting it as JATS, and converting again must reproduce the model.

use proptest::prelude::*;

use webstract::model::{
    Block, Body, Contributor, Date, Document, EditionMeta, Inline, List, ListItem, ListKind,
    Section,
};
use webstract::{BibItem, ConversionConfig, RefAuthor, convert_file, convert_str};

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn convert_fixture(name: &str) -> Document {
    let path = format!("{}/{}", FIXTURES_DIR, name);
    convert_file(path, &ConversionConfig::default())
        .unwrap_or_else(|e| panic!("failed to convert {name}: {e}"))
        .document
}

// ============================================================================
// JSON interchange round trip
// ============================================================================

#[test]
fn test_json_round_trip_dsi_article() {
    let doc = convert_fixture("dsi_article.xml");
    let json = webstract::to_json_string(&doc).unwrap();
    let back = webstract::from_json_str(&json).unwrap();
    assert_eq!(back, doc);
}

#[test]
fn test_json_round_trip_html_flavored() {
    let doc = convert_fixture("html_flavored.xml");
    let json = webstract::to_json_string(&doc).unwrap();
    let back = webstract::from_json_str(&json).unwrap();
    assert_eq!(back, doc);
}

// ============================================================================
// JATS re-export round trip
// ============================================================================

fn assert_jats_reround(name: &str) {
    let doc = convert_fixture(name);
    let xml = webstract::export_jats(&doc);
    let again = convert_str(&xml, &ConversionConfig::default())
        .unwrap_or_else(|e| panic!("re-parse of exported {name} failed: {e}\n{xml}"))
        .document;
    assert_eq!(again, doc, "JATS re-export drifted for {name}");
}

#[test]
fn test_jats_reround_dsi_article() {
    assert_jats_reround("dsi_article.xml");
}

#[test]
fn test_jats_reround_html_flavored() {
    assert_jats_reround("html_flavored.xml");
}

// ============================================================================
// Property: JSON round trip over generated documents
// ============================================================================

fn inline_strategy() -> impl Strategy<Value = Inline> {
    let leaf = prop_oneof![
        "[a-z ]{1,12}".prop_map(Inline::Text),
        Just(Inline::Break),
        (
            prop::collection::vec("[a-z]{1,8}", 1..3),
            prop::collection::vec(1u32..9, 1..3)
        )
            .prop_map(|(keys, labels)| Inline::CiteRef { keys, labels }),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Inline::Emphasis),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Inline::Bold),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Inline::Code),
            ("[a-z]{1,8}", prop::collection::vec(inner.clone(), 1..3)).prop_map(
                |(target, content)| Inline::CrossRef { target, content }
            ),
            ("https?://[a-z]{3,10}\\.org", prop::collection::vec(inner, 1..3))
                .prop_map(|(href, content)| Inline::Link { href, content }),
        ]
    })
}

fn block_strategy() -> impl Strategy<Value = Block> {
    let run = prop::collection::vec(inline_strategy(), 1..5).boxed();
    prop_oneof![
        run.clone().prop_map(Block::Paragraph),
        run.clone().prop_map(Block::Preformat),
        (
            prop_oneof![Just(ListKind::Order), Just(ListKind::Bullet)],
            prop::collection::vec(
                run.clone().prop_map(|r| ListItem {
                    blocks: vec![Block::Paragraph(r)]
                }),
                1..4
            )
        )
            .prop_map(|(kind, items)| Block::List(List { kind, items })),
        prop::collection::vec(run.prop_map(Block::Paragraph), 1..3).prop_map(Block::Quote),
    ]
}

fn section_strategy() -> impl Strategy<Value = Section> {
    (
        prop::option::of("[a-z]{1,6}"),
        prop::collection::vec(inline_strategy(), 1..3),
        prop::collection::vec(block_strategy(), 0..3),
    )
        .prop_map(|(id, title, blocks)| Section {
            id,
            title,
            blocks,
            sections: Vec::new(),
        })
}

fn bib_item_strategy() -> impl Strategy<Value = BibItem> {
    (
        "[a-z]{2,10}",
        prop::option::of("[A-Z][a-z]{1,8}"),
        prop::option::of(1900i32..2100),
        prop::option::of("[0-9]{1,3}-[0-9]{1,3}"),
    )
        .prop_map(|(key, title, year, pages)| BibItem {
            key,
            title,
            year,
            pages,
            authors: vec![RefAuthor::Name {
                surname: Some("Doe".into()),
                given_names: None,
            }],
            ..BibItem::default()
        })
}

fn document_strategy() -> impl Strategy<Value = Document> {
    (
        prop::collection::vec(inline_strategy(), 1..3),
        prop::collection::vec(
            ("[A-Z][a-z]{2,8}", prop::option::of("[A-Z][a-z]{2,8}")).prop_map(
                |(surname, given_names)| Contributor {
                    surname: Some(surname),
                    given_names,
                    ..Contributor::default()
                }
            ),
            0..3,
        ),
        prop::collection::vec(block_strategy(), 0..3),
        prop::collection::vec(block_strategy(), 0..4),
        prop::collection::vec(section_strategy(), 0..3),
        prop::collection::vec(bib_item_strategy(), 0..4),
        prop::option::of((1900i32..2100, prop::option::of(1u32..13)).prop_map(|(year, month)| {
            EditionMeta {
                succession: Some("dsi".into()),
                edition: Some(1),
                archived: Some(Date {
                    year,
                    month,
                    day: None,
                }),
            }
        })),
    )
        .prop_map(
            |(title, contributors, abstract_, blocks, sections, references, edition)| Document {
                title,
                contributors,
                abstract_,
                body: Body { blocks, sections },
                references,
                permissions: None,
                edition,
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_json_round_trip(doc in document_strategy()) {
        let json = webstract::to_json_string(&doc).unwrap();
        let back = webstract::from_json_str(&json).unwrap();
        prop_assert_eq!(back, doc);
    }
}
