//! JSON interchange encoding for the document model.
//!
//! The encoding is a direct serde mapping of the model types, so the
//! round-trip law holds by construction: `from_json_str(to_json_string(d))`
//! reproduces `d` field-by-field, including ordered sequences and nested
//! section trees. Other tree-structured encodings can share the same
//! logical schema through the same derives.

use std::io::{Read, Write};

use crate::error::Result;
use crate::model::Document;

/// Serialize a document to pretty-printed JSON with a trailing newline.
pub fn to_json_string(doc: &Document) -> Result<String> {
    let mut out = serde_json::to_string_pretty(doc)?;
    out.push('\n');
    Ok(out)
}

/// Deserialize a document from JSON text.
pub fn from_json_str(json: &str) -> Result<Document> {
    Ok(serde_json::from_str(json)?)
}

/// Serialize a document as JSON to a writer.
pub fn to_json_writer<W: Write>(doc: &Document, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, doc)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Deserialize a document from a JSON reader.
pub fn from_json_reader<R: Read>(reader: R) -> Result<Document> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, Body, Inline, ListKind, Section};

    fn sample_document() -> Document {
        Document {
            title: vec![
                Inline::Text("On ".into()),
                Inline::Emphasis(vec![Inline::Text("things".into())]),
            ],
            body: Body {
                blocks: vec![Block::Paragraph(vec![
                    Inline::Text("see".into()),
                    Inline::CiteRef {
                        keys: vec!["ref-a".into()],
                        labels: vec![1],
                    },
                ])],
                sections: vec![Section {
                    id: Some("s1".into()),
                    title: vec![Inline::Text("One".into())],
                    blocks: vec![Block::List(crate::model::List {
                        kind: ListKind::Order,
                        items: vec![],
                    })],
                    sections: vec![],
                }],
            },
            ..Document::default()
        }
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample_document();
        let json = to_json_string(&doc).unwrap();
        let back = from_json_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_json_output_is_deterministic() {
        let doc = sample_document();
        assert_eq!(
            to_json_string(&doc).unwrap(),
            to_json_string(&doc).unwrap()
        );
    }

    #[test]
    fn test_writer_reader_round_trip() {
        let doc = sample_document();
        let mut buffer = Vec::new();
        to_json_writer(&doc, &mut buffer).unwrap();
        let back = from_json_reader(buffer.as_slice()).unwrap();
        assert_eq!(back, doc);
    }
}
