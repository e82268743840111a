//! Element nodes and arena identifiers
//!
//! Elements are stored in a flat arena owned by the [`Dom`](super::dom::Dom);
//! parent/child links and the inverted indices refer to them by `NodeId`.
//! Slot 0 is always the synthetic root that owns the top-level elements.

use super::span::Span;
use std::collections::HashMap;

/// Index of an element in the arena
pub type NodeId = u32;

/// The synthetic root element. Owns all top-level elements, carries empty
/// spans and no attributes, and is never indexed.
pub const ROOT: NodeId = 0;

/// Tags whose open token implicitly terminates the element regardless of
/// any `</...>` in the source.
pub const SELF_CLOSING_TAGS: &[&str] = &[
    "meta", "link", "br", "input", "source", "hr", "track", "wbr", "param", "embed", "col", "base",
    "area", "img",
];

/// Check whether a tag name is in the self-closing set
#[inline]
pub fn is_self_closing(name: &str) -> bool {
    SELF_CLOSING_TAGS.contains(&name)
}

/// One parsed element: an open/close pair or a single self-closing token.
///
/// Nodes are populated while their open tag is consumed, linked into their
/// parent when the element closes (or the salvage path fires) and are
/// immutable afterwards.
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Tag name exactly as it appeared in the source
    pub name: String,
    /// Prefix before a `:` in the tag name, empty otherwise
    pub namespace: String,
    /// Attribute name/value pairs; keys unique, last write wins.
    /// Bare attributes store their own name as the value.
    pub attributes: HashMap<String, String>,
    /// Child elements in document order. Text is not materialized.
    pub children: Vec<NodeId>,
    /// Open tag through matching close tag, or the single self-closing token
    pub tag_span: Span,
    /// Content between open and close tags; empty for self-closing elements
    pub body_span: Span,
}

impl Element {
    /// Create a named element with no attributes or children yet
    pub(crate) fn new(name: String, namespace: String) -> Self {
        Self {
            name,
            namespace,
            ..Self::default()
        }
    }

    /// Create the synthetic root
    pub(crate) fn root() -> Self {
        Self::new("root".to_string(), String::new())
    }

    /// Attribute value by name
    #[inline]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Check whether this element closed properly
    #[inline]
    pub fn is_closed(&self) -> bool {
        !self.tag_span.is_unterminated()
    }
}
