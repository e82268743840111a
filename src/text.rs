//! Text extraction over a parsed subtree
//!
//! Reconstructs the inter-child text of any element straight from the parse
//! buffer: the slice before the first child, the slices between sibling
//! tag spans, the slice after the last child, descending recursively into
//! each child. Nothing is copied until the final string is assembled.

use crate::document::Document;
use crate::index::{NodeId, ROOT};
use std::collections::HashSet;

/// Concatenated text of the subtree rooted at `id`
pub(crate) fn inner_text(doc: &Document, id: NodeId) -> String {
    let mut out = String::new();
    collect(doc, id, None, &mut out);
    out
}

/// Like [`inner_text`], with every non-empty slice followed by `sep`
pub(crate) fn joined_text(doc: &Document, id: NodeId, sep: u8) -> String {
    let mut out = String::new();
    collect(doc, id, Some(sep), &mut out);
    out
}

/// Non-empty space-separated tokens of `joined_text(' ')`
pub(crate) fn term_set(doc: &Document, id: NodeId) -> HashSet<String> {
    joined_text(doc, id, b' ')
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn collect(doc: &Document, id: NodeId, sep: Option<u8>, out: &mut String) {
    let element = doc.dom().get(id);
    let (start, end) = if id == ROOT {
        (0, doc.len())
    } else {
        if element.body_span.is_unterminated() {
            return;
        }
        (element.body_span.start, element.body_span.end)
    };

    let mut pos = start;
    for &child in &element.children {
        let tag_span = doc.dom().get(child).tag_span;
        if tag_span.is_unterminated() {
            continue;
        }
        push_slice(doc.body(), pos, tag_span.start, sep, out);
        collect(doc, child, sep, out);
        pos = tag_span.end;
    }
    push_slice(doc.body(), pos, end, sep, out);
}

fn push_slice(buf: &[u8], start: usize, end: usize, sep: Option<u8>, out: &mut String) {
    if start >= end || end > buf.len() {
        return;
    }
    out.push_str(&String::from_utf8_lossy(&buf[start..end]));
    if let Some(sep) = sep {
        out.push(sep as char);
    }
}
