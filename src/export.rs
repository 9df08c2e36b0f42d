//! Regenerate canonical JATS XML from a document model.
//!
//! The exported tree uses the same JATS subset the assembler reads, so
//! converting a baseprint and exporting it again yields equivalent JATS:
//! parsing the exported XML reproduces the same [`Document`]. Grouped
//! citations are written back in their canonical shape (`sup`-wrapped
//! `xref` runs with comma separators and visible numbers).
//!
//! Output is compact: no indentation is invented, because whitespace
//! inside mixed content is significant.

use std::collections::HashMap;

use crate::model::{
    BibItem, Block, Contributor, Document, Inline, ListKind, Permissions, RefAuthor, Section,
};
use crate::xml::{NodeId, XmlTree, write_str};

/// Serialize a document to JATS XML text.
pub fn export_jats(doc: &Document) -> String {
    let mut exporter = Exporter {
        tree: XmlTree::new(),
        numbers: doc
            .references
            .iter()
            .enumerate()
            .map(|(i, item)| (item.key.clone(), i as u32 + 1))
            .collect(),
    };
    let article = exporter.article(doc);
    exporter.tree.append_child(NodeId::ROOT, article);
    write_str(&exporter.tree)
}

struct Exporter {
    tree: XmlTree,
    /// Citation number per reference key (positional after resolution).
    numbers: HashMap<String, u32>,
}

impl Exporter {
    fn article(&mut self, doc: &Document) -> NodeId {
        let article = self.tree.alloc_element("article");
        self.tree.set_attr(
            article,
            "xmlns:ali",
            "http://www.niso.org/schemas/ali/1.0",
        );
        self.tree
            .set_attr(article, "xmlns:xlink", "http://www.w3.org/1999/xlink");

        let front = self.tree.alloc_element("front");
        let meta = self.tree.alloc_element("article-meta");
        if let Some(edition) = &doc.edition {
            if let Some(succession) = &edition.succession {
                let id = self.element_with_text("article-id", succession);
                self.tree.set_attr(id, "pub-id-type", "dsi");
                self.tree.append_child(meta, id);
            }
            if let Some(number) = edition.edition {
                let version = self.element_with_text("article-version", &number.to_string());
                self.tree.append_child(meta, version);
            }
        }

        let title_group = self.tree.alloc_element("title-group");
        let title = self.tree.alloc_element("article-title");
        self.inlines(title, &doc.title);
        self.tree.append_child(title_group, title);
        self.tree.append_child(meta, title_group);

        if !doc.contributors.is_empty() {
            let group = self.tree.alloc_element("contrib-group");
            for contributor in &doc.contributors {
                let contrib = self.contrib(contributor);
                self.tree.append_child(group, contrib);
            }
            self.tree.append_child(meta, group);
        }

        if let Some(permissions) = &doc.permissions {
            let node = self.permissions(permissions);
            self.tree.append_child(meta, node);
        }

        if !doc.abstract_.is_empty() {
            let abstract_node = self.tree.alloc_element("abstract");
            self.blocks(abstract_node, &doc.abstract_);
            self.tree.append_child(meta, abstract_node);
        }

        if let Some(edition) = &doc.edition
            && let Some(date) = &edition.archived
        {
            let pub_date = self.tree.alloc_element("pub-date");
            self.tree.set_attr(pub_date, "date-type", "pub");
            let year = self.element_with_text("year", &date.year.to_string());
            self.tree.append_child(pub_date, year);
            if let Some(m) = date.month {
                let month = self.element_with_text("month", &m.to_string());
                self.tree.append_child(pub_date, month);
                if let Some(d) = date.day {
                    let day = self.element_with_text("day", &d.to_string());
                    self.tree.append_child(pub_date, day);
                }
            }
            self.tree.append_child(meta, pub_date);
        }

        self.tree.append_child(front, meta);
        self.tree.append_child(article, front);

        let body = self.tree.alloc_element("body");
        self.blocks(body, &doc.body.blocks);
        for section in &doc.body.sections {
            let sec = self.section(section);
            self.tree.append_child(body, sec);
        }
        self.tree.append_child(article, body);

        if !doc.references.is_empty() {
            let back = self.tree.alloc_element("back");
            let ref_list = self.tree.alloc_element("ref-list");
            for item in &doc.references {
                let ref_node = self.bib_item(item);
                self.tree.append_child(ref_list, ref_node);
            }
            self.tree.append_child(back, ref_list);
            self.tree.append_child(article, back);
        }

        article
    }

    fn element_with_text(&mut self, name: &str, text: &str) -> NodeId {
        let node = self.tree.alloc_element(name);
        if !text.is_empty() {
            let text_node = self.tree.alloc_text(text);
            self.tree.append_child(node, text_node);
        }
        node
    }

    fn contrib(&mut self, contributor: &Contributor) -> NodeId {
        let contrib = self.tree.alloc_element("contrib");
        self.tree.set_attr(contrib, "contrib-type", "author");
        if let Some(orcid) = &contributor.orcid {
            let id = self.element_with_text("contrib-id", &orcid.as_url());
            self.tree.set_attr(id, "contrib-id-type", "orcid");
            self.tree.append_child(contrib, id);
        }
        let name = self.tree.alloc_element("name");
        if let Some(surname) = &contributor.surname {
            let node = self.element_with_text("surname", surname);
            self.tree.append_child(name, node);
        }
        if let Some(given) = &contributor.given_names {
            let node = self.element_with_text("given-names", given);
            self.tree.append_child(name, node);
        }
        self.tree.append_child(contrib, name);
        if let Some(email) = &contributor.email {
            let node = self.element_with_text("email", email);
            self.tree.append_child(contrib, node);
        }
        if let Some(affiliation) = &contributor.affiliation {
            let xref = self.tree.alloc_element("xref");
            self.tree.set_attr(xref, "ref-type", "aff");
            self.tree.set_attr(xref, "rid", affiliation);
            self.tree.append_child(contrib, xref);
        }
        contrib
    }

    fn permissions(&mut self, permissions: &Permissions) -> NodeId {
        let node = self.tree.alloc_element("permissions");
        if let Some(statement) = &permissions.copyright_statement {
            let child = self.element_with_text("copyright-statement", statement);
            self.tree.append_child(node, child);
        }
        if !permissions.license_paragraph.is_empty() || permissions.license_url.is_some() {
            let license = self.tree.alloc_element("license");
            if !permissions.license_paragraph.is_empty() {
                let p = self.tree.alloc_element("license-p");
                self.inlines(p, &permissions.license_paragraph);
                self.tree.append_child(license, p);
            }
            if let Some(url) = &permissions.license_url {
                let ref_node = self.element_with_text("ali:license_ref", url);
                self.tree.append_child(license, ref_node);
            }
            self.tree.append_child(node, license);
        }
        node
    }

    fn section(&mut self, section: &Section) -> NodeId {
        let sec = self.tree.alloc_element("sec");
        if let Some(id) = &section.id {
            self.tree.set_attr(sec, "id", id);
        }
        let title = self.tree.alloc_element("title");
        self.inlines(title, &section.title);
        self.tree.append_child(sec, title);
        self.blocks(sec, &section.blocks);
        for child in &section.sections {
            let node = self.section(child);
            self.tree.append_child(sec, node);
        }
        sec
    }

    fn blocks(&mut self, parent: NodeId, blocks: &[Block]) {
        for block in blocks {
            let node = self.block(block);
            self.tree.append_child(parent, node);
        }
    }

    fn block(&mut self, block: &Block) -> NodeId {
        match block {
            Block::Paragraph(run) => {
                let p = self.tree.alloc_element("p");
                self.inlines(p, run);
                p
            }
            Block::List(list) => {
                let node = self.tree.alloc_element("list");
                let list_type = match list.kind {
                    ListKind::Order => "order",
                    ListKind::Bullet => "bullet",
                };
                self.tree.set_attr(node, "list-type", list_type);
                for item in &list.items {
                    let item_node = self.tree.alloc_element("list-item");
                    self.blocks(item_node, &item.blocks);
                    self.tree.append_child(node, item_node);
                }
                node
            }
            Block::DefList(def_list) => {
                let node = self.tree.alloc_element("def-list");
                for item in &def_list.items {
                    let item_node = self.tree.alloc_element("def-item");
                    let term = self.tree.alloc_element("term");
                    self.inlines(term, &item.term);
                    self.tree.append_child(item_node, term);
                    for def in &item.defs {
                        let def_node = self.tree.alloc_element("def");
                        self.blocks(def_node, &def.blocks);
                        self.tree.append_child(item_node, def_node);
                    }
                    self.tree.append_child(node, item_node);
                }
                node
            }
            Block::Quote(blocks) => {
                let node = self.tree.alloc_element("disp-quote");
                self.blocks(node, blocks);
                node
            }
            Block::Preformat(run) => {
                let node = self.tree.alloc_element("preformat");
                self.inlines(node, run);
                node
            }
            Block::Table(table) => {
                let wrap = self.tree.alloc_element("table-wrap");
                let table_node = self.tree.alloc_element("table");
                if !table.head.is_empty() {
                    let thead = self.tree.alloc_element("thead");
                    for row in &table.head {
                        let tr = self.table_row(row);
                        self.tree.append_child(thead, tr);
                    }
                    self.tree.append_child(table_node, thead);
                }
                if !table.body.is_empty() {
                    let tbody = self.tree.alloc_element("tbody");
                    for row in &table.body {
                        let tr = self.table_row(row);
                        self.tree.append_child(tbody, tr);
                    }
                    self.tree.append_child(table_node, tbody);
                }
                self.tree.append_child(wrap, table_node);
                wrap
            }
            Block::Figure(figure) => {
                let fig = self.tree.alloc_element("fig");
                if let Some(id) = &figure.id {
                    self.tree.set_attr(fig, "id", id);
                }
                if !figure.caption.is_empty() {
                    let caption = self.tree.alloc_element("caption");
                    let p = self.tree.alloc_element("p");
                    self.inlines(p, &figure.caption);
                    self.tree.append_child(caption, p);
                    self.tree.append_child(fig, caption);
                }
                if let Some(href) = &figure.graphic {
                    let graphic = self.tree.alloc_element("graphic");
                    self.tree.set_attr(graphic, "xlink:href", href);
                    self.tree.append_child(fig, graphic);
                }
                fig
            }
        }
    }

    fn table_row(&mut self, row: &crate::model::TableRow) -> NodeId {
        let tr = self.tree.alloc_element("tr");
        for cell in &row.cells {
            let node = self
                .tree
                .alloc_element(if cell.header { "th" } else { "td" });
            self.inlines(node, &cell.content);
            self.tree.append_child(tr, node);
        }
        tr
    }

    fn inlines(&mut self, parent: NodeId, run: &[Inline]) {
        for node in run {
            match node {
                Inline::Text(text) => {
                    let text_node = self.tree.alloc_text(text);
                    self.tree.append_child(parent, text_node);
                }
                Inline::Emphasis(inner) => self.wrap_inlines(parent, "italic", inner),
                Inline::Bold(inner) => self.wrap_inlines(parent, "bold", inner),
                Inline::Code(inner) => self.wrap_inlines(parent, "monospace", inner),
                Inline::Break => {
                    let br = self.tree.alloc_element("break");
                    self.tree.append_child(parent, br);
                }
                Inline::CrossRef { target, content } => {
                    let xref = self.tree.alloc_element("xref");
                    self.tree.set_attr(xref, "rid", target);
                    self.inlines(xref, content);
                    self.tree.append_child(parent, xref);
                }
                Inline::Link { href, content } => {
                    let link = self.tree.alloc_element("ext-link");
                    self.tree.set_attr(link, "ext-link-type", "uri");
                    self.tree.set_attr(link, "xlink:href", href);
                    self.inlines(link, content);
                    self.tree.append_child(parent, link);
                }
                Inline::CiteRef { keys, .. } => {
                    let group = self.citation_group(keys);
                    self.tree.append_child(parent, group);
                }
            }
        }
    }

    fn wrap_inlines(&mut self, parent: NodeId, name: &str, run: &[Inline]) {
        let node = self.tree.alloc_element(name);
        self.inlines(node, run);
        self.tree.append_child(parent, node);
    }

    /// Grouped citations serialize as a `sup` of bibliographic xrefs with
    /// visible numbers and comma separators.
    fn citation_group(&mut self, keys: &[String]) -> NodeId {
        let sup = self.tree.alloc_element("sup");
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                let sep = self.tree.alloc_text(",");
                self.tree.append_child(sup, sep);
            }
            let xref = self.tree.alloc_element("xref");
            self.tree.set_attr(xref, "rid", key);
            self.tree.set_attr(xref, "ref-type", "bibr");
            if let Some(number) = self.numbers.get(key) {
                let label = self.tree.alloc_text(&number.to_string());
                self.tree.append_child(xref, label);
            }
            self.tree.append_child(sup, xref);
        }
        sup
    }

    fn bib_item(&mut self, item: &BibItem) -> NodeId {
        let ref_node = self.tree.alloc_element("ref");
        self.tree.set_attr(ref_node, "id", &item.key);

        if let Some(raw) = &item.raw {
            let citation = self.element_with_text("mixed-citation", raw);
            self.tree.append_child(ref_node, citation);
            return ref_node;
        }

        let citation = self.tree.alloc_element("element-citation");
        if let Some(kind) = &item.publication_type {
            self.tree.set_attr(citation, "publication-type", kind);
        }
        if !item.authors.is_empty() {
            let group = self.tree.alloc_element("person-group");
            self.tree.set_attr(group, "person-group-type", "author");
            for author in &item.authors {
                match author {
                    RefAuthor::Name {
                        surname,
                        given_names,
                    } => {
                        let name = self.tree.alloc_element("name");
                        if let Some(s) = surname {
                            let node = self.element_with_text("surname", s);
                            self.tree.append_child(name, node);
                        }
                        if let Some(g) = given_names {
                            let node = self.element_with_text("given-names", g);
                            self.tree.append_child(name, node);
                        }
                        self.tree.append_child(group, name);
                    }
                    RefAuthor::Collab(text) => {
                        let node = self.element_with_text("string-name", text);
                        self.tree.append_child(group, node);
                    }
                }
            }
            self.tree.append_child(citation, group);
        }
        if let Some(title) = &item.title {
            let node = self.element_with_text("article-title", title);
            self.tree.append_child(citation, node);
        }
        if let Some(source) = &item.container_title {
            let node = self.element_with_text("source", source);
            self.tree.append_child(citation, node);
        }
        if let Some(year) = item.year {
            let node = self.element_with_text("year", &year.to_string());
            self.tree.append_child(citation, node);
        }
        if let Some(month) = item.month {
            let node = self.element_with_text("month", &month.to_string());
            self.tree.append_child(citation, node);
        }
        if let Some(edition) = item.edition {
            let node = self.element_with_text("edition", &edition.to_string());
            self.tree.append_child(citation, node);
        }
        if let Some(volume) = &item.volume {
            let node = self.element_with_text("volume", volume);
            self.tree.append_child(citation, node);
        }
        if let Some(issue) = &item.issue {
            let node = self.element_with_text("issue", issue);
            self.tree.append_child(citation, node);
        }
        if let Some(pages) = &item.pages {
            match pages.split_once('-') {
                Some((first, last)) => {
                    let fpage = self.element_with_text("fpage", first);
                    self.tree.append_child(citation, fpage);
                    let lpage = self.element_with_text("lpage", last);
                    self.tree.append_child(citation, lpage);
                }
                None => {
                    let fpage = self.element_with_text("fpage", pages);
                    self.tree.append_child(citation, fpage);
                }
            }
        }
        if let Some(doi) = &item.doi {
            let node = self.element_with_text("pub-id", doi);
            self.tree.set_attr(node, "pub-id-type", "doi");
            self.tree.append_child(citation, node);
        }
        if let Some(pmid) = &item.pmid {
            let node = self.element_with_text("pub-id", pmid);
            self.tree.set_attr(node, "pub-id-type", "pmid");
            self.tree.append_child(citation, node);
        }
        if let Some(url) = &item.url {
            let node = self.element_with_text("uri", url);
            self.tree.append_child(citation, node);
        }
        if let Some(accessed) = &item.accessed {
            let node = self.tree.alloc_element("date-in-citation");
            self.tree.set_attr(node, "content-type", "access-date");
            let year = self.element_with_text("year", &accessed.year.to_string());
            self.tree.append_child(node, year);
            if let Some(m) = accessed.month {
                let month = self.element_with_text("month", &m.to_string());
                self.tree.append_child(node, month);
                if let Some(d) = accessed.day {
                    let day = self.element_with_text("day", &d.to_string());
                    self.tree.append_child(node, day);
                }
            }
            self.tree.append_child(citation, node);
        }
        if let Some(publisher) = &item.publisher {
            let node = self.element_with_text("publisher-name", publisher);
            self.tree.append_child(citation, node);
        }
        if let Some(loc) = &item.publisher_loc {
            let node = self.element_with_text("publisher-loc", loc);
            self.tree.append_child(citation, node);
        }
        if let Some(isbn) = &item.isbn {
            let node = self.element_with_text("isbn", isbn);
            self.tree.append_child(citation, node);
        }
        if let Some(issn) = &item.issn {
            let node = self.element_with_text("issn", issn);
            self.tree.append_child(citation, node);
        }
        self.tree.append_child(ref_node, citation);
        ref_node
    }
}
