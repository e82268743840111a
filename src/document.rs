//! Parsed document and the element view over it
//!
//! A [`Document`] owns the parse buffer and the [`Dom`] built from it; it is
//! read-only after the parse. [`ElementRef`] pairs a document borrow with a
//! node id so callers navigate the tree without touching raw ids.

use crate::core::scanner::Dialect;
use crate::core::tokenizer::ParseState;
use crate::index::{Dom, Element, NodeId, Span, ROOT};
use crate::query::Query;
use crate::text;
use std::collections::{HashMap, HashSet};

/// An immutable parsed document
#[derive(Debug)]
pub struct Document {
    buf: Vec<u8>,
    dom: Dom,
    html: bool,
    namespace_tag: Option<NodeId>,
}

impl Document {
    /// Parse a whole buffer with the standard literal dialect
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Document {
        ParseState::new_whole(bytes.into(), Dialect::Standard).run()
    }

    /// Parse a whole buffer whose quotes are backslash-escaped (`\"`/`\'`),
    /// as when the markup is itself embedded in a string literal
    pub fn parse_escaped(bytes: impl Into<Vec<u8>>) -> Document {
        ParseState::new_whole(bytes.into(), Dialect::Escaped).run()
    }

    pub(crate) fn from_parts(
        buf: Vec<u8>,
        dom: Dom,
        html: bool,
        namespace_tag: Option<NodeId>,
    ) -> Self {
        Self {
            buf,
            dom,
            html,
            namespace_tag,
        }
    }

    /// The raw parse buffer
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.buf
    }

    /// Buffer length in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The index structures built during the parse
    #[inline]
    pub fn dom(&self) -> &Dom {
        &self.dom
    }

    /// The synthetic root owning all top-level elements
    pub fn root(&self) -> ElementRef<'_> {
        self.element(ROOT)
    }

    /// Whether the document opened with a `doctype` prolog declaring `html`
    #[inline]
    pub fn html(&self) -> bool {
        self.html
    }

    /// The leading `<?...?>`/`<!...>` prolog element, if one was consumed
    pub fn namespace_tag(&self) -> Option<ElementRef<'_>> {
        self.namespace_tag.map(|id| self.element(id))
    }

    /// True when every element closed properly; salvaged or truncated
    /// elements make this false
    pub fn success(&self) -> bool {
        self.dom.fully_terminated()
    }

    /// `xmlns:prefix` declarations seen anywhere in the document
    pub fn namespaces(&self) -> &HashMap<String, String> {
        self.dom.namespaces()
    }

    /// Number of indexed elements, the synthetic root excluded
    pub fn element_count(&self) -> usize {
        self.dom.element_count()
    }

    /// First element with the given tag name, in document order
    pub fn first(&self, name: &str) -> Option<ElementRef<'_>> {
        self.dom.get_tags(name).first().map(|&id| self.element(id))
    }

    /// All elements with the given tag name, in document order
    pub fn filter(&self, name: &str) -> Vec<ElementRef<'_>> {
        self.elements_for(self.dom.get_tags(name))
    }

    /// Direct index access: elements under a raw key (`name`, `"*"`,
    /// `".class"`, `"#id"`)
    pub fn get_tags(&self, key: &str) -> Vec<ElementRef<'_>> {
        self.elements_for(self.dom.get_tags(key))
    }

    /// Every indexed element in document order
    pub fn elements(&self) -> Vec<ElementRef<'_>> {
        self.get_tags("*")
    }

    /// Concatenated text of the whole document
    pub fn inner_text(&self) -> String {
        text::inner_text(self, ROOT)
    }

    /// Document text with every non-empty slice followed by `sep`
    pub fn joined_text(&self, sep: u8) -> String {
        text::joined_text(self, ROOT, sep)
    }

    /// Set of non-empty space-separated tokens in the document text
    pub fn term_set(&self) -> HashSet<String> {
        text::term_set(self, ROOT)
    }

    /// Run a selector query over the whole document.
    ///
    /// Panics on a malformed selector; an empty selector matches nothing.
    pub fn query(&self, selector: &str) -> Query<'_> {
        Query::new(self, selector)
    }

    #[inline]
    pub(crate) fn element(&self, id: NodeId) -> ElementRef<'_> {
        ElementRef { doc: self, id }
    }

    pub(crate) fn elements_for(&self, ids: &[NodeId]) -> Vec<ElementRef<'_>> {
        ids.iter().map(|&id| self.element(id)).collect()
    }
}

/// A borrowed view of one element in a document
#[derive(Clone, Copy)]
pub struct ElementRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> ElementRef<'a> {
    /// Arena id of this element
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The underlying node
    #[inline]
    pub fn node(&self) -> &'a Element {
        self.doc.dom.get(self.id)
    }

    /// Tag name exactly as it appeared
    #[inline]
    pub fn name(&self) -> &'a str {
        &self.node().name
    }

    /// Namespace prefix, empty when the tag carried none
    #[inline]
    pub fn namespace(&self) -> &'a str {
        &self.node().namespace
    }

    /// All attributes of this element
    #[inline]
    pub fn attributes(&self) -> &'a HashMap<String, String> {
        &self.node().attributes
    }

    /// Attribute value by name
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.node().attribute(name)
    }

    /// Open tag through matching close tag
    #[inline]
    pub fn tag_span(&self) -> Span {
        self.node().tag_span
    }

    /// Content between the open and close tags
    #[inline]
    pub fn body_span(&self) -> Span {
        self.node().body_span
    }

    /// Whether the element closed properly
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.node().is_closed()
    }

    /// Direct children in document order
    pub fn children(&self) -> Vec<ElementRef<'a>> {
        self.doc.elements_for(&self.node().children)
    }

    /// All descendants with the given name, depth-first
    pub fn find_all(&self, name: &str) -> Vec<ElementRef<'a>> {
        let mut out = Vec::new();
        self.find_into(name, &mut out);
        out
    }

    fn find_into(&self, name: &str, out: &mut Vec<ElementRef<'a>>) {
        for &child in &self.node().children {
            let child = self.doc.element(child);
            if child.name() == name {
                out.push(child);
            }
            child.find_into(name, out);
        }
    }

    /// First descendant with the given name by pre-order, if any
    pub fn first(&self, name: &str) -> Option<ElementRef<'a>> {
        for &child in &self.node().children {
            let child = self.doc.element(child);
            if child.name() == name {
                return Some(child);
            }
            if let Some(found) = child.first(name) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text of this subtree
    pub fn inner_text(&self) -> String {
        text::inner_text(self.doc, self.id)
    }

    /// Subtree text with every non-empty slice followed by `sep`
    pub fn joined_text(&self, sep: u8) -> String {
        text::joined_text(self.doc, self.id, sep)
    }

    /// The raw source of this element, open tag to close tag
    pub fn outer_text(&self) -> String {
        String::from_utf8_lossy(self.tag_span().slice(self.doc.body())).into_owned()
    }

    /// Run a selector against this subtree only
    pub fn query(&self, selector: &str) -> Query<'a> {
        Query::scoped(self.doc, selector, vec![self.id])
    }
}

impl PartialEq for ElementRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for ElementRef<'_> {}

impl std::fmt::Debug for ElementRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementRef")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("tag_span", &self.tag_span())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_filter() {
        let doc = Document::parse("<div>a</div><span></span><div>b</div>");
        assert_eq!(doc.first("div").unwrap().inner_text(), "a");
        assert_eq!(doc.filter("div").len(), 2);
        assert!(doc.first("nope").is_none());
    }

    #[test]
    fn test_find_all_recurses() {
        let doc = Document::parse("<a><b><a></a></b><a></a></a>");
        let outer = doc.root().children()[0];
        assert_eq!(outer.find_all("a").len(), 2);
        assert_eq!(doc.filter("a").len(), 3);
    }

    #[test]
    fn test_element_first_is_preorder() {
        let doc = Document::parse("<x><y><z id=\"deep\"></z></y><z id=\"shallow\"></z></x>");
        let x = doc.first("x").unwrap();
        assert_eq!(x.first("z").unwrap().attribute("id"), Some("deep"));
    }

    #[test]
    fn test_element_identity() {
        let doc = Document::parse("<div></div>");
        assert_eq!(doc.first("div"), doc.root().children().first().copied());
    }

    #[test]
    fn test_offset_map_positions() {
        let doc = Document::parse("<a><b></b></a>");
        let a = doc.first("a").unwrap();
        let b = doc.first("b").unwrap();
        assert_eq!(doc.dom().offset_at(0), Some(a.id()));
        assert_eq!(doc.dom().offset_at(3), Some(b.id()));
        assert_eq!(doc.dom().offset_at(1), None);
    }
}
