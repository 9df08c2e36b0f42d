//! Citation resolution: numeric style, order of first appearance.
//!
//! A single left-to-right, depth-first traversal of the body assigns each
//! cited reference key a number on first encounter, starting at 1. Every
//! citation-reference node receives the resolved label list for its keys
//! (sorted and deduplicated when collapsing is on, the numeric-style
//! default). Afterwards the document's reference list is reordered to
//! match: cited items in number order, then never-cited items in their
//! original document position, numbered continuing the sequence.
//!
//! One wrinkle carried over from rendered baseprints: in-text citations
//! often already display numbers. While those claimed numbers agree with
//! the reference list's document order, that order wins — uncited earlier
//! entries are pulled forward so existing numbering survives a re-render.
//! The first disagreement switches assignment to pure first-encounter
//! order for the rest of the document. Either way numbers stay dense,
//! ascending, and deterministic.
//!
//! A key missing from the reference table is fatal. A dangling citation
//! means the source document is corrupt, and rendering it anyway would
//! risk silently wrong citation numbers.

use std::collections::HashMap;

use crate::biblio::RefTable;
use crate::error::{Error, Result};
use crate::issue::{IssueKind, IssueLog};
use crate::model::{BibItem, Block, Document, Inline, Section};

/// Citation-style configuration, passed explicitly so conversions stay
/// parallel-safe (no ambient style state).
#[derive(Debug, Clone)]
pub struct CitationConfig {
    /// Collapse grouped citations into one sorted, deduplicated label
    /// list ("1,2" rather than two separate numbers). On by default, as
    /// numeric bibliography styles require.
    pub collapse: bool,
}

impl Default for CitationConfig {
    fn default() -> Self {
        CitationConfig { collapse: true }
    }
}

struct Resolver<'a> {
    table: &'a RefTable,
    config: &'a CitationConfig,
    issues: &'a mut IssueLog,
    assigned: HashMap<String, u32>,
    /// Keys in assigned-number order (index + 1 = number).
    order: Vec<String>,
    /// True while every citation so far has matched original list order.
    original_order: bool,
    /// Innermost enclosing section id, for diagnostics.
    section: Option<String>,
}

/// Resolve every citation-reference in the document body and reorder the
/// reference list by assigned number.
pub fn resolve_citations(
    doc: &mut Document,
    table: &RefTable,
    config: &CitationConfig,
    issues: &mut IssueLog,
) -> Result<()> {
    let mut resolver = Resolver {
        table,
        config,
        issues,
        assigned: HashMap::new(),
        order: Vec::new(),
        original_order: true,
        section: None,
    };

    for block in &mut doc.body.blocks {
        resolver.block(block)?;
    }
    resolver.sections(&mut doc.body.sections)?;

    doc.references = resolver.reordered();
    Ok(())
}

impl Resolver<'_> {
    fn sections(&mut self, sections: &mut [Section]) -> Result<()> {
        for section in sections {
            let outer = self.section.clone();
            if section.id.is_some() {
                self.section = section.id.clone();
            }
            self.run(&mut section.title)?;
            for block in &mut section.blocks {
                self.block(block)?;
            }
            self.sections(&mut section.sections)?;
            self.section = outer;
        }
        Ok(())
    }

    fn block(&mut self, block: &mut Block) -> Result<()> {
        match block {
            Block::Paragraph(run) | Block::Preformat(run) => self.run(run)?,
            Block::List(list) => {
                for item in &mut list.items {
                    for block in &mut item.blocks {
                        self.block(block)?;
                    }
                }
            }
            Block::DefList(def_list) => {
                for item in &mut def_list.items {
                    self.run(&mut item.term)?;
                    for def in &mut item.defs {
                        for block in &mut def.blocks {
                            self.block(block)?;
                        }
                    }
                }
            }
            Block::Quote(blocks) => {
                for block in blocks {
                    self.block(block)?;
                }
            }
            Block::Table(table) => {
                for row in table.head.iter_mut().chain(table.body.iter_mut()) {
                    for cell in &mut row.cells {
                        self.run(&mut cell.content)?;
                    }
                }
            }
            Block::Figure(figure) => self.run(&mut figure.caption)?,
        }
        Ok(())
    }

    fn run(&mut self, run: &mut [Inline]) -> Result<()> {
        for node in run {
            match node {
                Inline::CiteRef { keys, labels } => {
                    let claims: Vec<u32> = labels.clone();
                    labels.clear();
                    for (i, key) in keys.iter().enumerate() {
                        let claim = claims.get(i).copied().filter(|&n| n > 0);
                        let number = self.number_for(key, claim)?;
                        if let Some(claimed) = claim
                            && claimed != number
                        {
                            self.issues.record(IssueKind::RenumberedCitation {
                                key: key.clone(),
                                from: claimed,
                                to: number,
                            });
                        }
                        labels.push(number);
                    }
                    if self.config.collapse {
                        labels.sort_unstable();
                        labels.dedup();
                    }
                }
                Inline::Emphasis(inner)
                | Inline::Bold(inner)
                | Inline::Code(inner)
                | Inline::CrossRef { content: inner, .. }
                | Inline::Link { content: inner, .. } => self.run(inner)?,
                Inline::Text(_) | Inline::Break => {}
            }
        }
        Ok(())
    }

    /// Assign (or look up) the number for one cited key.
    fn number_for(&mut self, key: &str, claim: Option<u32>) -> Result<u32> {
        if let Some(&number) = self.assigned.get(key) {
            return Ok(number);
        }
        let Some(position) = self.table.position(key) else {
            return Err(Error::UnresolvedCitation {
                key: key.to_string(),
                section: self.section.clone().unwrap_or_else(|| "body".into()),
            });
        };
        if self.original_order {
            if claim == Some(position as u32 + 1) {
                // Still following the reference list's own order: pull
                // forward the not-yet-cited entries before this one so the
                // claimed number stays correct.
                for j in self.order.len()..position {
                    let pulled = self.table.items()[j].key.clone();
                    self.order.push(pulled.clone());
                    self.assigned.insert(pulled, self.order.len() as u32);
                }
            } else {
                self.original_order = false;
            }
        }
        self.order.push(key.to_string());
        let number = self.order.len() as u32;
        self.assigned.insert(key.to_string(), number);
        Ok(number)
    }

    /// Cited items in number order, then uncited items in document order.
    fn reordered(&self) -> Vec<BibItem> {
        let mut out: Vec<BibItem> = self
            .order
            .iter()
            .filter_map(|key| self.table.get(key).cloned())
            .collect();
        out.extend(
            self.table
                .items()
                .iter()
                .filter(|item| !self.assigned.contains_key(&item.key))
                .cloned(),
        );
        out
    }
}
