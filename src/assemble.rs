//! Document Model Assembler: retargeted tree to canonical [`Document`].
//!
//! The assembler runs after the retargeter and metadata synthesizer, so it
//! only ever sees JATS-legal names in JATS-legal positions. It walks the
//! front matter and body once, producing the owned model tree. Citation
//! cross-references are gathered into citation-reference nodes here
//! (including the grouping of adjacent `xref` elements) but numbering is
//! left to the resolver.
//!
//! Tolerant/strict split: missing titles and metadata degrade to
//! placeholders or issues, while anything reference-shaped that cannot be
//! modeled exactly is an error. A partially assembled document is never
//! returned.

use std::collections::HashSet;

use crate::biblio::RefTable;
use crate::error::{Error, Result};
use crate::issue::{IssueKind, IssueLog};
use crate::model::{
    Block, Body, CcLicense, Contributor, Date, DefItem, DefList, Definition, Document,
    EditionMeta, Figure, Inline, List, ListItem, ListKind, NO_TITLE, Orcid, Permissions, Section,
    Table, TableCell, TableRow, plain_text,
};
use crate::xml::{NodeId, XmlTree};

/// Inline elements that may open a synthetic paragraph at block level.
const INLINE_TAGS: &[&str] = &[
    "italic",
    "bold",
    "monospace",
    "ext-link",
    "xref",
    "break",
    "sup",
    "sub",
];

struct Assembler<'a> {
    tree: &'a XmlTree,
    table: &'a RefTable,
    issues: &'a mut IssueLog,
}

/// Build the document model from a retargeted, synthesized tree.
///
/// The returned document's reference list is in original document order;
/// run the citation resolver to number and reorder it.
pub fn assemble(tree: &XmlTree, table: &RefTable, issues: &mut IssueLog) -> Result<Document> {
    let article = tree
        .root_element()
        .ok_or_else(|| Error::MissingElement("article".into()))?;
    if tree.name(article) != Some("article") {
        return Err(Error::Structure(format!(
            "expected <article> document element, found <{}>",
            tree.name(article).unwrap_or("?")
        )));
    }

    let mut asm = Assembler {
        tree,
        table,
        issues,
    };
    let mut doc = Document::default();

    if let Some(front) = tree.find_child(article, "front")
        && let Some(meta) = tree.find_child(front, "article-meta")
    {
        asm.article_meta(meta, &mut doc);
    }
    if let Some(body) = tree.find_child(article, "body") {
        let (blocks, sections) = asm.proto_section(body, true);
        doc.body = Body { blocks, sections };
    }
    doc.references = table.items().to_vec();

    if plain_text(&doc.title).trim().is_empty() {
        doc.title = vec![Inline::Text(NO_TITLE.into())];
    }
    Ok(doc)
}

impl Assembler<'_> {
    fn unsupported(&mut self, id: NodeId, parent: Option<&str>) {
        let tag = self.tree.name(id).unwrap_or("?").to_string();
        self.issues.record_at(
            IssueKind::UnsupportedElement {
                tag,
                parent: parent.map(str::to_string),
            },
            self.tree.node(id).line,
        );
    }

    // ------------------------------------------------------------------
    // Front matter
    // ------------------------------------------------------------------

    fn article_meta(&mut self, meta: NodeId, doc: &mut Document) {
        let mut edition = EditionMeta::default();
        let mut archived: Option<Date> = None;

        for child in self.tree.children(meta) {
            match self.tree.name(child) {
                Some("title-group") => {
                    if let Some(title) = self.tree.find_child(child, "article-title") {
                        doc.title = self.inlines(title, false);
                    }
                }
                Some("contrib-group") => self.contrib_group(child, doc),
                Some("abstract") => {
                    let (blocks, sections) = self.proto_section(child, false);
                    doc.abstract_ = blocks;
                    for section in sections {
                        // Abstract sections flatten: keep their blocks in order.
                        doc.abstract_.extend(section.blocks);
                    }
                }
                Some("permissions") => doc.permissions = self.permissions(child),
                Some("article-id") => {
                    if self.tree.attr(child, "pub-id-type") == Some("dsi") {
                        edition.succession = nonblank(self.tree.text_content(child));
                    }
                }
                Some("article-version") => {
                    let text = self.tree.text_content(child);
                    match text.trim().parse::<u32>() {
                        Ok(value) => edition.edition = Some(value),
                        Err(_) => self.issues.record_at(
                            IssueKind::InvalidInteger {
                                tag: "article-version".into(),
                                value: text.trim().to_string(),
                            },
                            self.tree.node(child).line,
                        ),
                    }
                }
                Some("pub-date") => {
                    if archived.is_none() {
                        archived = self.date(child);
                    }
                }
                // Synthesized or presentation-only metadata carries nothing
                // the model needs.
                Some("article-categories") | Some("elocation-id") | Some("history")
                | Some("aff") => {}
                Some(_) => self.unsupported(child, Some("article-meta")),
                None => {}
            }
        }

        if edition.succession.is_some() || edition.edition.is_some() {
            edition.archived = archived;
            doc.edition = Some(edition);
        }
    }

    fn contrib_group(&mut self, group: NodeId, doc: &mut Document) {
        for child in self.tree.children(group) {
            match self.tree.name(child) {
                Some("contrib") => {
                    if let Some(contributor) = self.contrib(child) {
                        doc.contributors.push(contributor);
                    }
                }
                Some(_) => self.unsupported(child, Some("contrib-group")),
                None => {}
            }
        }
    }

    fn contrib(&mut self, contrib: NodeId) -> Option<Contributor> {
        let contrib_type = self.tree.attr(contrib, "contrib-type");
        if let Some(value) = contrib_type
            && value != "author"
        {
            self.issues.record_at(
                IssueKind::UnsupportedAttributeValue {
                    tag: "contrib".into(),
                    attribute: "contrib-type".into(),
                    value: value.to_string(),
                },
                self.tree.node(contrib).line,
            );
            return None;
        }

        let mut out = Contributor::default();
        for child in self.tree.children(contrib) {
            match self.tree.name(child) {
                Some("name") => {
                    out.surname = self
                        .tree
                        .find_child(child, "surname")
                        .and_then(|n| nonblank(self.tree.text_content(n)));
                    out.given_names = self
                        .tree
                        .find_child(child, "given-names")
                        .and_then(|n| nonblank(self.tree.text_content(n)));
                }
                Some("email") => out.email = nonblank(self.tree.text_content(child)),
                Some("contrib-id") => {
                    if self.tree.attr(child, "contrib-id-type") == Some("orcid") {
                        let url = self.tree.text_content(child);
                        let url = url.trim();
                        match Orcid::from_url(url) {
                            Some(orcid) => out.orcid = Some(orcid),
                            None => self.issues.record_at(
                                IssueKind::InvalidOrcid {
                                    value: url.to_string(),
                                },
                                self.tree.node(child).line,
                            ),
                        }
                    }
                }
                Some("xref") => {
                    if self.tree.attr(child, "ref-type") == Some("aff") {
                        out.affiliation = self.tree.attr(child, "rid").map(str::to_string);
                    }
                }
                Some(_) => self.unsupported(child, Some("contrib")),
                None => {}
            }
        }

        if out.surname.is_none() && out.given_names.is_none() {
            self.issues.record_at(
                IssueKind::MissingContent {
                    tag: "contrib".into(),
                },
                self.tree.node(contrib).line,
            );
            return None;
        }
        Some(out)
    }

    fn permissions(&mut self, node: NodeId) -> Option<Permissions> {
        let mut out = Permissions::default();
        if let Some(statement) = self.tree.find_child(node, "copyright-statement") {
            out.copyright_statement = nonblank(self.tree.text_content(statement));
        }
        if let Some(license) = self.tree.find_child(node, "license") {
            if let Some(p) = self.tree.find_child(license, "license-p") {
                out.license_paragraph = self.inlines(p, false);
            }
            if let Some(ref_node) = self.tree.find_child(license, "ali:license_ref") {
                out.license_url = nonblank(self.tree.text_content(ref_node));
            }
            if let Some(url) = &out.license_url {
                out.cc_license = CcLicense::from_url(url);
            }
        }
        let blank = out.copyright_statement.is_none()
            && out.license_paragraph.is_empty()
            && out.license_url.is_none();
        if blank { None } else { Some(out) }
    }

    fn date(&mut self, node: NodeId) -> Option<Date> {
        let year = self.tree.find_child(node, "year")?;
        let year = self.tree.text_content(year).trim().parse::<i32>().ok()?;
        let mut date = Date::year(year);
        if let Some(month) = self.tree.find_child(node, "month")
            && let Ok(m) = self.tree.text_content(month).trim().parse::<u32>()
            && (1..=12).contains(&m)
        {
            date.month = Some(m);
            if let Some(day) = self.tree.find_child(node, "day")
                && let Ok(d) = self.tree.text_content(day).trim().parse::<u32>()
                && (1..=31).contains(&d)
            {
                date.day = Some(d);
            }
        }
        Some(date)
    }

    // ------------------------------------------------------------------
    // Body content
    // ------------------------------------------------------------------

    /// Parse mixed section-level content: leading blocks plus subsections.
    fn proto_section(&mut self, parent: NodeId, cite: bool) -> (Vec<Block>, Vec<Section>) {
        let mut blocks = Vec::new();
        let mut sections = Vec::new();
        let mut pending_inlines: Vec<NodeId> = Vec::new();

        let children: Vec<NodeId> = self.tree.children(parent).collect();
        for child in children {
            let name = self.tree.name(child);
            match name {
                Some("sec") => {
                    self.flush_paragraph(&mut pending_inlines, &mut blocks, cite);
                    sections.push(self.section(child, cite));
                }
                // A section's own title is handled by section(); a title on
                // an abstract or quote carries no model content.
                Some("title") => {}
                Some(tag) if INLINE_TAGS.contains(&tag) => pending_inlines.push(child),
                None => {
                    let blank = self.tree.text(child).is_none_or(|t| t.trim().is_empty());
                    if !blank {
                        pending_inlines.push(child);
                    } else if !pending_inlines.is_empty() {
                        pending_inlines.push(child);
                    }
                }
                Some(_) => {
                    self.flush_paragraph(&mut pending_inlines, &mut blocks, cite);
                    if let Some(block) = self.block(child, cite) {
                        blocks.push(block);
                    }
                }
            }
        }
        self.flush_paragraph(&mut pending_inlines, &mut blocks, cite);
        (blocks, sections)
    }

    /// Wrap loose inline content found at block level into a paragraph.
    fn flush_paragraph(&mut self, pending: &mut Vec<NodeId>, blocks: &mut Vec<Block>, cite: bool) {
        if pending.is_empty() {
            return;
        }
        let nodes = std::mem::take(pending);
        let mut run = Vec::new();
        for id in nodes {
            self.inline_node(id, cite, &mut run);
        }
        let run = merge_citation_groups(run);
        let has_markup = run.iter().any(|n| !matches!(n, Inline::Text(_)));
        if has_markup || !plain_text(&run).trim().is_empty() {
            blocks.push(Block::Paragraph(run));
        }
    }

    fn section(&mut self, sec: NodeId, cite: bool) -> Section {
        let id = self.tree.attr(sec, "id").map(str::to_string);
        let title = self
            .tree
            .find_child(sec, "title")
            .map(|t| self.inlines(t, false))
            .unwrap_or_default();
        let (blocks, sections) = self.proto_section(sec, cite);
        Section {
            id,
            title,
            blocks,
            sections,
        }
    }

    /// Parse one block-level element. Returns None for unsupported markup.
    fn block(&mut self, id: NodeId, cite: bool) -> Option<Block> {
        match self.tree.name(id)? {
            "p" => Some(Block::Paragraph(self.inlines(id, cite))),
            "list" => Some(Block::List(self.list(id, cite))),
            "def-list" => Some(Block::DefList(self.def_list(id, cite))),
            "disp-quote" => Some(Block::Quote(self.blocks(id, cite))),
            "code" | "preformat" | "pre" => Some(Block::Preformat(self.inlines(id, cite))),
            "table-wrap" => Some(Block::Table(self.table(id, cite))),
            "fig" => Some(Block::Figure(self.figure(id))),
            _ => {
                self.unsupported(id, self.tree.parent_name(id));
                None
            }
        }
    }

    /// Parse children of a pure block container (no subsections expected).
    fn blocks(&mut self, parent: NodeId, cite: bool) -> Vec<Block> {
        let (blocks, sections) = self.proto_section(parent, cite);
        for _section in sections {
            self.issues.record(IssueKind::UnsupportedElement {
                tag: "sec".into(),
                parent: self.tree.name(parent).map(str::to_string),
            });
        }
        blocks
    }

    fn list(&mut self, list: NodeId, cite: bool) -> List {
        let kind = match self.tree.attr(list, "list-type") {
            Some("order") => ListKind::Order,
            Some("bullet") | None => ListKind::Bullet,
            Some(other) => {
                self.issues.record_at(
                    IssueKind::UnsupportedAttributeValue {
                        tag: "list".into(),
                        attribute: "list-type".into(),
                        value: other.to_string(),
                    },
                    self.tree.node(list).line,
                );
                ListKind::Bullet
            }
        };
        let mut items = Vec::new();
        for child in self.tree.children(list) {
            match self.tree.name(child) {
                Some("list-item") => items.push(ListItem {
                    blocks: self.blocks(child, cite),
                }),
                Some(_) => self.unsupported(child, Some("list")),
                None => {}
            }
        }
        List { kind, items }
    }

    fn def_list(&mut self, def_list: NodeId, cite: bool) -> DefList {
        let mut items = Vec::new();
        for child in self.tree.children(def_list) {
            match self.tree.name(child) {
                Some("def-item") => {
                    let term = self
                        .tree
                        .find_child(child, "term")
                        .map(|t| self.inlines(t, cite))
                        .unwrap_or_default();
                    let mut defs = Vec::new();
                    for def in self.tree.children(child) {
                        if self.tree.name(def) == Some("def") {
                            defs.push(Definition {
                                blocks: self.blocks(def, cite),
                            });
                        }
                    }
                    items.push(DefItem { term, defs });
                }
                Some("title") => {}
                Some(_) => self.unsupported(child, Some("def-list")),
                None => {}
            }
        }
        DefList { items }
    }

    fn table(&mut self, wrap: NodeId, cite: bool) -> Table {
        let mut out = Table::default();
        let Some(table) = self.tree.find_child(wrap, "table") else {
            return out;
        };
        for group in self.tree.children(table) {
            match self.tree.name(group) {
                Some("thead") => {
                    for row in self.tree.children(group) {
                        if self.tree.name(row) == Some("tr") {
                            out.head.push(self.table_row(row, cite));
                        }
                    }
                }
                Some("tbody") => {
                    for row in self.tree.children(group) {
                        if self.tree.name(row) == Some("tr") {
                            out.body.push(self.table_row(row, cite));
                        }
                    }
                }
                Some("tr") => out.body.push(self.table_row(group, cite)),
                Some(_) => self.unsupported(group, Some("table")),
                None => {}
            }
        }
        out
    }

    fn table_row(&mut self, row: NodeId, cite: bool) -> TableRow {
        let mut cells = Vec::new();
        for cell in self.tree.children(row) {
            match self.tree.name(cell) {
                Some("th") => cells.push(TableCell {
                    header: true,
                    content: self.inlines(cell, cite),
                }),
                Some("td") => cells.push(TableCell {
                    header: false,
                    content: self.inlines(cell, cite),
                }),
                Some(_) => self.unsupported(cell, Some("tr")),
                None => {}
            }
        }
        TableRow { cells }
    }

    fn figure(&mut self, fig: NodeId) -> Figure {
        let id = self.tree.attr(fig, "id").map(str::to_string);
        let caption = self
            .tree
            .find_child(fig, "caption")
            .map(|c| {
                // Captions hold a title and/or paragraphs; flatten to a run.
                let mut run = Vec::new();
                for child in self.tree.children(c) {
                    run.extend(self.inlines(child, false));
                }
                run
            })
            .unwrap_or_default();
        let graphic = self
            .tree
            .find_child(fig, "graphic")
            .and_then(|g| self.tree.attr(g, "xlink:href"))
            .map(str::to_string);
        Figure {
            id,
            caption,
            graphic,
        }
    }

    // ------------------------------------------------------------------
    // Inline content
    // ------------------------------------------------------------------

    /// Parse an element's mixed content into an inline run. When `cite` is
    /// set, bibliographic `xref`s become citation-reference nodes and
    /// adjacent groups are merged.
    fn inlines(&mut self, parent: NodeId, cite: bool) -> Vec<Inline> {
        let mut run = Vec::new();
        let children: Vec<NodeId> = self.tree.children(parent).collect();
        for child in children {
            self.inline_node(child, cite, &mut run);
        }
        merge_citation_groups(run)
    }

    fn inline_node(&mut self, id: NodeId, cite: bool, run: &mut Vec<Inline>) {
        if let Some(text) = self.tree.text(id) {
            run.push(Inline::Text(text.to_string()));
            return;
        }
        match self.tree.name(id).unwrap_or("") {
            "italic" => {
                let inner = self.inlines(id, cite);
                run.push(Inline::Emphasis(inner));
            }
            "bold" => {
                let inner = self.inlines(id, cite);
                run.push(Inline::Bold(inner));
            }
            // JATS allows preformatted text among p-elements; inside an
            // inline run it degrades to a code span.
            "monospace" | "code" | "preformat" | "pre" => {
                let inner = self.inlines(id, cite);
                run.push(Inline::Code(inner));
            }
            "break" => run.push(Inline::Break),
            "ext-link" => {
                let href = self
                    .tree
                    .attr(id, "xlink:href")
                    .map(str::to_string)
                    .unwrap_or_else(|| self.tree.text_content(id));
                let content = self.inlines(id, cite);
                run.push(Inline::Link { href, content });
            }
            "xref" => self.xref(id, cite, run),
            "sup" if cite && self.is_citation_group(id) => {
                self.citation_group(id, run);
            }
            _ => {
                // Flatten unsupported inline markup, keeping its text.
                self.unsupported(id, self.tree.parent_name(id));
                let children: Vec<NodeId> = self.tree.children(id).collect();
                for child in children {
                    self.inline_node(child, cite, run);
                }
            }
        }
    }

    fn xref(&mut self, id: NodeId, cite: bool, run: &mut Vec<Inline>) {
        let Some(rid) = self.tree.attr(id, "rid").map(str::to_string) else {
            self.issues.record_at(
                IssueKind::UnsupportedAttribute {
                    tag: "xref".into(),
                    attribute: "rid".into(),
                },
                self.tree.node(id).line,
            );
            return;
        };
        let ref_type = self.tree.attr(id, "ref-type");
        if ref_type == Some("bibr") && cite {
            run.push(Inline::CiteRef {
                keys: vec![rid],
                labels: vec![self.claimed_number(id)],
            });
        } else {
            let content = self.inlines(id, false);
            run.push(Inline::CrossRef {
                target: rid,
                content,
            });
        }
    }

    /// A `sup` wrapping only bibliographic xrefs (plus separators) is the
    /// canonical shape of a grouped citation.
    fn is_citation_group(&self, sup: NodeId) -> bool {
        let mut has_xref = false;
        for child in self.tree.children(sup) {
            match self.tree.name(child) {
                Some("xref") => {
                    if self.tree.attr(child, "ref-type") != Some("bibr") {
                        return false;
                    }
                    has_xref = true;
                }
                Some(_) => return false,
                None => {}
            }
        }
        has_xref
    }

    fn citation_group(&mut self, sup: NodeId, run: &mut Vec<Inline>) {
        let mut keys = Vec::new();
        let mut labels = Vec::new();
        for child in self.tree.children(sup) {
            match self.tree.name(child) {
                Some("xref") => {
                    if let Some(rid) = self.tree.attr(child, "rid") {
                        keys.push(rid.to_string());
                        labels.push(self.claimed_number(child));
                    }
                }
                None => {
                    let text = self.tree.text(child).unwrap_or("");
                    if !is_group_separator(text, true) {
                        self.issues.record_at(
                            IssueKind::UnknownCitationSeparator {
                                text: text.trim().to_string(),
                            },
                            self.tree.node(sup).line,
                        );
                    }
                }
                Some(_) => {}
            }
        }
        if !keys.is_empty() {
            run.push(Inline::CiteRef { keys, labels });
        }
    }

    /// Citation number claimed by the source markup (0 when absent or
    /// non-numeric). The resolver validates it against the assignment.
    fn claimed_number(&self, xref: NodeId) -> u32 {
        self.tree
            .text_content(xref)
            .trim()
            .parse::<u32>()
            .unwrap_or(0)
    }
}

/// True when `text` only separates citations within a visual group.
///
/// Inside a `sup` group, brackets also count as separators (the original
/// emits `[1,2]`-style tuples); between bare xrefs only whitespace, commas,
/// and semicolons merge.
fn is_group_separator(text: &str, in_sup: bool) -> bool {
    text.chars().all(|c| {
        c.is_whitespace() || c == ',' || c == ';' || (in_sup && matches!(c, '[' | ']' | '(' | ')'))
    })
}

/// Merge adjacent citation-reference nodes separated only by separator
/// text, mirroring the collapse behavior of numeric bibliography styles.
fn merge_citation_groups(run: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(run.len());
    let mut i = 0;
    while i < run.len() {
        match &run[i] {
            Inline::CiteRef { keys, labels } => {
                let mut keys = keys.clone();
                let mut labels = labels.clone();
                let mut j = i + 1;
                loop {
                    // Look past a single separator text node for another citation.
                    let next = match run.get(j) {
                        Some(Inline::CiteRef { .. }) => j,
                        Some(Inline::Text(t))
                            if is_group_separator(t, false)
                                && matches!(run.get(j + 1), Some(Inline::CiteRef { .. })) =>
                        {
                            j + 1
                        }
                        _ => break,
                    };
                    if let Some(Inline::CiteRef {
                        keys: more_keys,
                        labels: more_labels,
                    }) = run.get(next)
                    {
                        keys.extend(more_keys.iter().cloned());
                        labels.extend(more_labels.iter().copied());
                    }
                    j = next + 1;
                }
                out.push(Inline::CiteRef { keys, labels });
                i = j;
            }
            _ => {
                out.push(run[i].clone());
                i += 1;
            }
        }
    }
    out
}

/// Final structural validation of an assembled document.
///
/// Section and figure ids must be unique; every non-citation
/// cross-reference must target a known section, figure, or reference key.
pub fn validate(doc: &Document) -> Result<()> {
    let mut targets: HashSet<&str> = HashSet::new();
    collect_section_ids(&doc.body.sections, &mut targets)?;
    for block in doc.abstract_.iter().chain(doc.body.blocks.iter()) {
        collect_figure_ids(block, &mut targets)?;
    }
    for section in all_sections(&doc.body.sections) {
        for block in &section.blocks {
            collect_figure_ids(block, &mut targets)?;
        }
    }
    let keys: HashSet<&str> = doc.references.iter().map(|r| r.key.as_str()).collect();

    let mut check = |run: &[Inline]| -> Result<()> {
        for target in cross_ref_targets(run) {
            if !targets.contains(target.as_str()) && !keys.contains(target.as_str()) {
                return Err(Error::CrossReference(target));
            }
        }
        Ok(())
    };

    for block in doc.abstract_.iter().chain(doc.body.blocks.iter()) {
        visit_block_inlines(block, &mut check)?;
    }
    for section in all_sections(&doc.body.sections) {
        check(&section.title)?;
        for block in &section.blocks {
            visit_block_inlines(block, &mut check)?;
        }
    }
    Ok(())
}

fn collect_section_ids<'a>(sections: &'a [Section], out: &mut HashSet<&'a str>) -> Result<()> {
    for section in sections {
        if let Some(id) = &section.id
            && !out.insert(id.as_str())
        {
            return Err(Error::Structure(format!("duplicate section id: {id}")));
        }
        collect_section_ids(&section.sections, out)?;
    }
    Ok(())
}

fn collect_figure_ids<'a>(block: &'a Block, out: &mut HashSet<&'a str>) -> Result<()> {
    match block {
        Block::Figure(figure) => {
            if let Some(id) = &figure.id
                && !out.insert(id.as_str())
            {
                return Err(Error::Structure(format!("duplicate figure id: {id}")));
            }
        }
        Block::List(list) => {
            for item in &list.items {
                for block in &item.blocks {
                    collect_figure_ids(block, out)?;
                }
            }
        }
        Block::DefList(def_list) => {
            for item in &def_list.items {
                for def in &item.defs {
                    for block in &def.blocks {
                        collect_figure_ids(block, out)?;
                    }
                }
            }
        }
        Block::Quote(blocks) => {
            for block in blocks {
                collect_figure_ids(block, out)?;
            }
        }
        Block::Paragraph(_) | Block::Preformat(_) | Block::Table(_) => {}
    }
    Ok(())
}

/// Depth-first iterator over a section tree.
pub(crate) fn all_sections(sections: &[Section]) -> Vec<&Section> {
    let mut out = Vec::new();
    fn walk<'a>(sections: &'a [Section], out: &mut Vec<&'a Section>) {
        for section in sections {
            out.push(section);
            walk(&section.sections, out);
        }
    }
    walk(sections, &mut out);
    out
}

fn cross_ref_targets(run: &[Inline]) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(run: &[Inline], out: &mut Vec<String>) {
        for node in run {
            match node {
                Inline::CrossRef { target, content } => {
                    out.push(target.clone());
                    walk(content, out);
                }
                Inline::Emphasis(inner)
                | Inline::Bold(inner)
                | Inline::Code(inner)
                | Inline::Link { content: inner, .. } => walk(inner, out),
                _ => {}
            }
        }
    }
    walk(run, &mut out);
    out
}

fn visit_block_inlines<F>(block: &Block, check: &mut F) -> Result<()>
where
    F: FnMut(&[Inline]) -> Result<()>,
{
    match block {
        Block::Paragraph(run) | Block::Preformat(run) => check(run)?,
        Block::List(list) => {
            for item in &list.items {
                for block in &item.blocks {
                    visit_block_inlines(block, check)?;
                }
            }
        }
        Block::DefList(def_list) => {
            for item in &def_list.items {
                check(&item.term)?;
                for def in &item.defs {
                    for block in &def.blocks {
                        visit_block_inlines(block, check)?;
                    }
                }
            }
        }
        Block::Quote(blocks) => {
            for block in blocks {
                visit_block_inlines(block, check)?;
            }
        }
        Block::Table(table) => {
            for row in table.head.iter().chain(table.body.iter()) {
                for cell in &row.cells {
                    check(&cell.content)?;
                }
            }
        }
        Block::Figure(figure) => check(&figure.caption)?,
    }
    Ok(())
}

fn nonblank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::biblio::build_ref_table;
    use crate::xml::parse_str;

    fn assemble_src(src: &str) -> Result<(Document, IssueLog)> {
        let tree = parse_str(src)?;
        let mut issues = IssueLog::new();
        let table = build_ref_table(&tree, &mut issues)?;
        let doc = assemble(&tree, &table, &mut issues)?;
        Ok((doc, issues))
    }

    #[test]
    fn test_minimalish_article() {
        let (doc, _) = assemble_src(concat!(
            "<article><front><article-meta>",
            "<title-group><article-title>A test</article-title></title-group>",
            "<contrib-group><contrib contrib-type=\"author\">",
            "<name><surname>Wang</surname></name>",
            "</contrib></contrib-group>",
            "<abstract><p>A simple test.</p></abstract>",
            "</article-meta></front><body/></article>"
        ))
        .unwrap();
        assert_eq!(plain_text(&doc.title), "A test");
        assert_eq!(doc.contributors.len(), 1);
        assert_eq!(doc.contributors[0].surname.as_deref(), Some("Wang"));
        assert_eq!(
            doc.abstract_,
            vec![Block::Paragraph(vec![Inline::Text("A simple test.".into())])]
        );
    }

    #[test]
    fn test_missing_title_gets_sentinel() {
        let (doc, _) = assemble_src("<article><body><p>x</p></body></article>").unwrap();
        assert_eq!(plain_text(&doc.title), NO_TITLE);
    }

    #[test]
    fn test_contributor_orcid_and_email() {
        let (doc, issues) = assemble_src(concat!(
            "<article><front><article-meta><contrib-group>",
            "<contrib contrib-type=\"author\">",
            "<contrib-id contrib-id-type=\"orcid\">https://orcid.org/0000-0002-1825-0097</contrib-id>",
            "<name><surname>Ellerman</surname><given-names>E. Castedo</given-names></name>",
            "<email>castedo@castedo.com</email>",
            "</contrib></contrib-group></article-meta></front><body/></article>"
        ))
        .unwrap();
        assert!(issues.is_empty());
        let author = &doc.contributors[0];
        assert_eq!(author.email.as_deref(), Some("castedo@castedo.com"));
        assert_eq!(
            author.orcid.as_ref().map(|o| o.as_url()),
            Some("https://orcid.org/0000-0002-1825-0097".into())
        );
    }

    #[test]
    fn test_invalid_orcid_is_issue_not_error() {
        let (doc, issues) = assemble_src(concat!(
            "<article><front><article-meta><contrib-group>",
            "<contrib contrib-type=\"author\">",
            "<contrib-id contrib-id-type=\"orcid\">not-an-orcid</contrib-id>",
            "<name><surname>Wang</surname></name>",
            "</contrib></contrib-group></article-meta></front><body/></article>"
        ))
        .unwrap();
        assert!(doc.contributors[0].orcid.is_none());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_section_tree_nesting() {
        let (doc, _) = assemble_src(concat!(
            "<article><body>",
            "<p>intro</p>",
            "<sec id=\"s1\"><title>One</title><p>a</p>",
            "<sec id=\"s1.1\"><title>Inner</title><p>b</p></sec>",
            "</sec>",
            "</body></article>"
        ))
        .unwrap();
        assert_eq!(doc.body.blocks.len(), 1);
        assert_eq!(doc.body.sections.len(), 1);
        let s1 = &doc.body.sections[0];
        assert_eq!(s1.id.as_deref(), Some("s1"));
        assert_eq!(plain_text(&s1.title), "One");
        assert_eq!(s1.sections[0].id.as_deref(), Some("s1.1"));
    }

    #[test]
    fn test_adjacent_xrefs_merge_into_one_citation() {
        let (doc, _) = assemble_src(concat!(
            "<article><body><p>see ",
            "<xref rid=\"ra\" ref-type=\"bibr\"/>, ",
            "<xref rid=\"rb\" ref-type=\"bibr\"/>; ",
            "<xref rid=\"rc\" ref-type=\"bibr\"/>.</p></body>",
            "<back><ref-list>",
            "<ref id=\"ra\"><element-citation/></ref>",
            "<ref id=\"rb\"><element-citation/></ref>",
            "<ref id=\"rc\"><element-citation/></ref>",
            "</ref-list></back></article>"
        ))
        .unwrap();
        let Block::Paragraph(run) = &doc.body.blocks[0] else {
            panic!("expected paragraph");
        };
        let cites: Vec<_> = run
            .iter()
            .filter_map(|n| match n {
                Inline::CiteRef { keys, .. } => Some(keys.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(cites, vec![vec!["ra", "rb", "rc"]]);
    }

    #[test]
    fn test_sup_wrapped_citation_group() {
        let (doc, issues) = assemble_src(concat!(
            "<article><body><p>known",
            "<sup><xref rid=\"ra\" ref-type=\"bibr\">1</xref>,",
            "<xref rid=\"rb\" ref-type=\"bibr\">2</xref></sup>.</p></body>",
            "<back><ref-list>",
            "<ref id=\"ra\"><element-citation/></ref>",
            "<ref id=\"rb\"><element-citation/></ref>",
            "</ref-list></back></article>"
        ))
        .unwrap();
        assert!(issues.is_empty());
        let Block::Paragraph(run) = &doc.body.blocks[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(
            &run[1],
            Inline::CiteRef { keys, .. } if keys == &vec!["ra".to_string(), "rb".to_string()]
        ));
    }

    #[test]
    fn test_separated_citations_stay_apart() {
        let (doc, _) = assemble_src(concat!(
            "<article><body><p>",
            "<xref rid=\"ra\" ref-type=\"bibr\"/> and also ",
            "<xref rid=\"rb\" ref-type=\"bibr\"/></p></body>",
            "<back><ref-list>",
            "<ref id=\"ra\"><element-citation/></ref>",
            "<ref id=\"rb\"><element-citation/></ref>",
            "</ref-list></back></article>"
        ))
        .unwrap();
        let Block::Paragraph(run) = &doc.body.blocks[0] else {
            panic!("expected paragraph");
        };
        let cite_count = run
            .iter()
            .filter(|n| matches!(n, Inline::CiteRef { .. }))
            .count();
        assert_eq!(cite_count, 2);
    }

    #[test]
    fn test_loose_inlines_get_paragraph_wrapped() {
        let (doc, _) = assemble_src(
            "<article><body>loose <italic>text</italic><p>real</p></body></article>",
        )
        .unwrap();
        assert_eq!(doc.body.blocks.len(), 2);
        assert!(matches!(&doc.body.blocks[0], Block::Paragraph(run)
            if plain_text(run) == "loose text"));
    }

    #[test]
    fn test_validate_rejects_unknown_cross_ref() {
        let (doc, _) = assemble_src(concat!(
            "<article><body>",
            "<p>see <xref rid=\"nowhere\">here</xref></p>",
            "</body></article>"
        ))
        .unwrap();
        let err = validate(&doc).unwrap_err();
        assert!(matches!(err, Error::CrossReference(target) if target == "nowhere"));
    }

    #[test]
    fn test_validate_accepts_section_target() {
        let (doc, _) = assemble_src(concat!(
            "<article><body>",
            "<p>see <xref rid=\"s1\">section</xref></p>",
            "<sec id=\"s1\"><title>One</title><p>x</p></sec>",
            "</body></article>"
        ))
        .unwrap();
        validate(&doc).unwrap();
    }

    #[test]
    fn test_validate_rejects_duplicate_section_ids() {
        let (doc, _) = assemble_src(concat!(
            "<article><body>",
            "<sec id=\"s1\"><title>A</title><p>x</p></sec>",
            "<sec id=\"s1\"><title>B</title><p>y</p></sec>",
            "</body></article>"
        ))
        .unwrap();
        assert!(matches!(validate(&doc), Err(Error::Structure(_))));
    }

    #[test]
    fn test_permissions_cc_license() {
        let (doc, _) = assemble_src(concat!(
            "<article><front><article-meta><permissions>",
            "<copyright-statement>\u{a9} 2023 The Authors</copyright-statement>",
            "<license><license-p>Open access.</license-p>",
            "<ali:license_ref>https://creativecommons.org/licenses/by/4.0/</ali:license_ref>",
            "</license></permissions></article-meta></front><body/></article>"
        ))
        .unwrap();
        let permissions = doc.permissions.unwrap();
        assert_eq!(permissions.cc_license, Some(CcLicense::By));
        assert_eq!(
            permissions.copyright_statement.as_deref(),
            Some("\u{a9} 2023 The Authors")
        );
    }

    #[test]
    fn test_edition_metadata_from_dsi() {
        let (doc, _) = assemble_src(concat!(
            "<article><front><article-meta>",
            "<article-id pub-id-type=\"dsi\">1wFGhvmv8XY6GJivFq2jMhEGK6k</article-id>",
            "<article-version>3</article-version>",
            "<pub-date date-type=\"pub\"><year>2023</year><month>3</month><day>31</day></pub-date>",
            "</article-meta></front><body/></article>"
        ))
        .unwrap();
        let edition = doc.edition.unwrap();
        assert_eq!(
            edition.succession.as_deref(),
            Some("1wFGhvmv8XY6GJivFq2jMhEGK6k")
        );
        assert_eq!(edition.edition, Some(3));
        assert_eq!(
            edition.archived,
            Some(Date {
                year: 2023,
                month: Some(3),
                day: Some(31)
            })
        );
    }

    #[test]
    fn test_no_edition_without_succession() {
        let (doc, _) = assemble_src(concat!(
            "<article><front><article-meta>",
            "<pub-date date-type=\"pub\"><year>1970</year></pub-date>",
            "</article-meta></front><body/></article>"
        ))
        .unwrap();
        assert!(doc.edition.is_none());
    }
}
