//! CSS-style selector queries over a parsed document
//!
//! `tag`, `.class`, `#id` and `*` qualifiers, concatenation for AND,
//! whitespace for descendant and `>` for direct child. Queries read only
//! the inverted indices and the tree; the document never changes under
//! them.

pub mod parallel;

mod eval;
mod selector;

use crate::document::{Document, ElementRef};
use crate::index::NodeId;

/// A lazily evaluated selector query.
///
/// Obtained from [`Document::query`] or [`ElementRef::query`]; results come
/// from [`get`](Query::get), [`first`](Query::first) or
/// [`last`](Query::last), in document order.
pub struct Query<'a> {
    doc: &'a Document,
    selector: String,
    seed: Option<Vec<NodeId>>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(doc: &'a Document, selector: &str) -> Self {
        Self {
            doc,
            selector: selector.to_string(),
            seed: None,
        }
    }

    pub(crate) fn scoped(doc: &'a Document, selector: &str, seed: Vec<NodeId>) -> Self {
        Self {
            doc,
            selector: selector.to_string(),
            seed: Some(seed),
        }
    }

    fn run(&self) -> Vec<NodeId> {
        let compiled = match selector::compile(&self.selector) {
            Ok(compiled) => compiled,
            Err(reason) => panic!("invalid selector {:?}: {reason}", self.selector),
        };
        eval::evaluate(self.doc, &compiled, self.seed.as_deref())
    }

    /// All matches in document order. Empty when nothing matches or the
    /// selector is empty.
    ///
    /// # Panics
    /// On a malformed selector (leading combinator, unsupported qualifier
    /// character); selector strings are a programming contract.
    pub fn get(&self) -> Vec<ElementRef<'a>> {
        self.doc.elements_for(&self.run())
    }

    /// First match, if any
    pub fn first(&self) -> Option<ElementRef<'a>> {
        self.run().first().map(|&id| self.doc.element(id))
    }

    /// Last match, if any
    pub fn last(&self) -> Option<ElementRef<'a>> {
        self.run().last().map(|&id| self.doc.element(id))
    }

    /// Narrow this query: evaluate it, then run `selector` against the
    /// result set as a descendant scope
    pub fn query(&self, selector: &str) -> Query<'a> {
        Query::scoped(self.doc, selector, self.run())
    }
}

#[cfg(test)]
mod tests {
    use crate::document::Document;

    #[test]
    fn test_extended_nested_query() {
        let payload = concat!(
            r#"<a class="rofl" id="a"><div></div>"#,
            "<b><c><e><a><e></e><e class=\"lol\">lol</e></a></e></c></b></a>"
        );
        let doc = Document::parse(payload);
        let tags = doc.query("#a.rofl > b a > e.lol").get();

        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name(), "e");
        assert_eq!(tags[0].inner_text(), "lol");
    }

    #[test]
    fn test_extended_query() {
        let doc = Document::parse(
            r#"
            <a class="rofl" id="a">
                <div>
                    <b></b>
                </div>Hi!
            </a>
            <div class="rofl" id="a">Hi!</div>
            How are you?
            <div class="lol">Bye.</div>
            <span id="a" class="rofl"></span>
        "#,
        );

        assert!(doc.query("#a.rofl > b").get().is_empty());
        assert_eq!(doc.query("#a.rofl b").first().unwrap().name(), "b");
        assert_eq!(doc.query("#a.rofl div").first().unwrap().name(), "div");
        assert_eq!(doc.query("#a.rofl").first().unwrap().name(), "a");
        assert!(doc.query("").get().is_empty());
        assert_eq!(doc.query("a").first().unwrap().name(), "a");
        assert_eq!(doc.query("div").get().len(), 3);
        assert_eq!(doc.query("div.rofl").get().len(), 1);
    }

    #[test]
    fn test_id_query_first_writer_wins() {
        let doc = Document::parse(
            r#"<div class="rofl" id="a">Hi!</div>How are you?<div class="lol">Bye.</div><span id="a" class="rofl"></span>"#,
        );
        let result = doc.query("#a").get();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name(), "div");
    }

    #[test]
    fn test_subqueries() {
        let doc = Document::parse(
            r#"<div class="rofl" id="a"><yolo>Hi!</yolo></div>How are you?<div class="lol">Bye.</div><span id="a" class="rofl"></span>"#,
        );
        let result = doc.query("#a").query("yolo").get();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].name(), "yolo");
    }

    #[test]
    fn test_element_scoped_query() {
        let doc = Document::parse("<a><b><c></c></b></a><c></c>");
        let a = doc.first("a").unwrap();
        assert_eq!(a.query("c").get().len(), 1);
        assert_eq!(doc.query("c").get().len(), 2);
    }

    #[test]
    fn test_first_and_last_identity() {
        let doc = Document::parse(
            r#"<div class="rofl">Hi!</div>How are you?<div class="lol">Bye.</div><span class="rofl"></span>"#,
        );

        let children = doc.root().children();
        assert_eq!(Some(children[0]), doc.query("div").first());
        assert_eq!(Some(children[1]), doc.query("div").last());
        assert_eq!(doc.query("span").first(), doc.query("span").last());
        assert!(doc.query("body").first().is_none());
        assert_eq!(doc.query(".rofl").last(), doc.query("span").last());
    }

    #[test]
    fn test_wildcard() {
        let doc = Document::parse(r#"<div attr="a"><li></li><a></a></div><p></p>"#);
        assert_eq!(doc.query("*").get().len(), 4);
    }

    #[test]
    #[should_panic(expected = "invalid selector")]
    fn test_invalid_selector_panics() {
        let doc = Document::parse("<a><p></a></p><br/>");
        doc.query("a + b").first();
    }

    #[test]
    fn test_unescaped_close_via_query() {
        let doc = Document::parse("<a><p></a></p><br/>");
        assert!(doc.query("a").first().unwrap().children().is_empty());
        assert!(doc.query("p").first().is_some());
        assert!(doc.query("br").first().is_some());
    }
}
