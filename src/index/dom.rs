//! Dom - element arena plus the lookup structures built during the parse
//!
//! Three structures are maintained alongside the tree itself:
//! - the offset map: start byte of an open-tag `<` to the element produced
//!   there, the resume point for streaming re-entry;
//! - the inverted tag map: `name`, `"*"`, `".class"` and `"#id"` keys to
//!   elements in document order;
//! - the namespace table collected from `xmlns:prefix` declarations.

use super::node::{Element, NodeId, ROOT};
use std::collections::HashMap;

/// Element arena and indices for one parsed document
#[derive(Debug)]
pub struct Dom {
    /// Slot 0 is the synthetic root
    nodes: Vec<Element>,
    /// Open-tag `<` offset to the element parsed there; keys unique
    offsets: HashMap<usize, NodeId>,
    /// Inverted indices in insertion (document) order
    tags: HashMap<String, Vec<NodeId>>,
    /// `xmlns:prefix` declarations seen anywhere in the document
    namespaces: HashMap<String, String>,
}

impl Dom {
    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Element::root()],
            offsets: HashMap::new(),
            tags: HashMap::new(),
            namespaces: HashMap::new(),
        }
    }

    /// Borrow an element
    #[inline]
    pub fn get(&self, id: NodeId) -> &Element {
        &self.nodes[id as usize]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Element {
        &mut self.nodes[id as usize]
    }

    /// The synthetic root element
    #[inline]
    pub fn root(&self) -> &Element {
        self.get(ROOT)
    }

    /// Elements under an index key, in document order. `"*"` keys every
    /// element, `".cls"` keys whole-token class members, `"#id"` holds at
    /// most one element.
    pub fn get_tags(&self, key: &str) -> &[NodeId] {
        self.tags.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Element parsed at the given open-tag byte offset
    #[inline]
    pub fn offset_at(&self, offset: usize) -> Option<NodeId> {
        self.offsets.get(&offset).copied()
    }

    /// Number of indexed elements (the cardinality of the `"*"` key)
    #[inline]
    pub fn element_count(&self) -> usize {
        self.get_tags("*").len()
    }

    /// Declared namespaces, `prefix` to URI
    #[inline]
    pub fn namespaces(&self) -> &HashMap<String, String> {
        &self.namespaces
    }

    pub(crate) fn push_node(&mut self, node: Element) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Record the element parsed at `offset`. One element per position.
    pub(crate) fn insert_offset(&mut self, offset: usize, id: NodeId) {
        let prev = self.offsets.insert(offset, id);
        debug_assert!(prev.is_none(), "duplicate offset-map entry at {offset}");
    }

    /// Index an element under its name and the `"*"` key
    pub(crate) fn index_element(&mut self, id: NodeId) {
        let name = self.get(id).name.clone();
        self.add_key(name, id);
        self.add_key("*".to_string(), id);
    }

    pub(crate) fn add_key(&mut self, key: String, id: NodeId) {
        self.tags.entry(key).or_default().push(id);
    }

    /// Index the whole-space-separated tokens of a `class` attribute.
    /// Empty tokens are dropped and repeated tokens index the element once.
    pub(crate) fn add_class_keys(&mut self, id: NodeId, class: &str) {
        let mut seen: Vec<&str> = Vec::new();
        for token in class.split(' ').filter(|t| !t.is_empty()) {
            if seen.contains(&token) {
                continue;
            }
            seen.push(token);
            self.add_key(format!(".{token}"), id);
        }
    }

    /// Index an `id` attribute; the first element claiming a key keeps it
    pub(crate) fn add_id_key(&mut self, id_value: &str, id: NodeId) {
        let key = format!("#{id_value}");
        self.tags.entry(key).or_insert_with(|| vec![id]);
    }

    pub(crate) fn set_namespace(&mut self, prefix: String, uri: String) {
        self.namespaces.insert(prefix, uri);
    }

    /// Check that no element carries an unterminated outer span
    pub(crate) fn fully_terminated(&self) -> bool {
        self.nodes
            .iter()
            .skip(1)
            .all(|n| !n.tag_span.is_unterminated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_root() {
        let dom = Dom::new();
        assert_eq!(dom.root().name, "root");
        assert_eq!(dom.element_count(), 0);
    }

    #[test]
    fn test_index_element() {
        let mut dom = Dom::new();
        let id = dom.push_node(Element::new("div".into(), String::new()));
        dom.index_element(id);

        assert_eq!(dom.get_tags("div"), &[id]);
        assert_eq!(dom.get_tags("*"), &[id]);
        assert_eq!(dom.element_count(), 1);
        assert!(dom.get_tags("span").is_empty());
    }

    #[test]
    fn test_class_tokenization() {
        let mut dom = Dom::new();
        let id = dom.push_node(Element::new("x".into(), String::new()));
        dom.add_class_keys(id, "a rofl  lol rofl ");

        assert_eq!(dom.get_tags(".a"), &[id]);
        assert_eq!(dom.get_tags(".lol"), &[id]);
        // repeated class indexes the element once
        assert_eq!(dom.get_tags(".rofl"), &[id]);
        // runs of spaces never produce a bare "." key
        assert!(dom.get_tags(".").is_empty());
    }

    #[test]
    fn test_id_first_writer_wins() {
        let mut dom = Dom::new();
        let a = dom.push_node(Element::new("div".into(), String::new()));
        let b = dom.push_node(Element::new("span".into(), String::new()));
        dom.add_id_key("a", a);
        dom.add_id_key("a", b);

        assert_eq!(dom.get_tags("#a"), &[a]);
    }
}
