//! Recursive-descent tag driver
//!
//! Single pass, no backtracking: three mutually recursive entry points
//! (`parse_body`, `consume_tag`, `parse_attributes`) walk the buffer and
//! commit elements into the [`Dom`] as their open tags are consumed.
//!
//! Malformed markup never fails the parse. An element whose body cannot be
//! completed keeps its indexed entry with an `UNTERMINATED` span, its
//! provisional children are dropped, and scanning resumes one byte past the
//! opening `<`; the offset-map cache then re-adopts the completed subtrees
//! into the surrounding parent.

use super::cursor::{ChunkHook, Source};
use super::scanner::{is_alpha, Dialect};
use crate::document::Document;
use crate::index::{is_self_closing, Dom, Element, NodeId, Span, ROOT};
use std::sync::atomic::AtomicBool;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::debug;

/// Mutable state of one parse run
pub(crate) struct ParseState {
    pub(crate) buf: Vec<u8>,
    pub(crate) source: Source,
    pub(crate) dialect: Dialect,
    pub(crate) dom: Dom,
    /// Element whose body is being parsed; scoped save/restore in every
    /// entry point
    current: NodeId,
    html: bool,
    namespace_tag: Option<NodeId>,
}

impl ParseState {
    pub(crate) fn new_whole(buf: Vec<u8>, dialect: Dialect) -> Self {
        Self {
            buf,
            source: Source::Whole,
            dialect,
            dom: Dom::new(),
            current: ROOT,
            html: false,
            namespace_tag: None,
        }
    }

    pub(crate) fn new_streaming(
        initial: Vec<u8>,
        rx: Receiver<Vec<u8>>,
        complete: Arc<AtomicBool>,
        hook: Option<ChunkHook>,
    ) -> Self {
        Self {
            buf: initial,
            source: Source::Streaming { rx, complete, hook },
            dialect: Dialect::Standard,
            dom: Dom::new(),
            current: ROOT,
            html: false,
            namespace_tag: None,
        }
    }

    /// Run the parse to end of input and hand back the finished document
    pub(crate) fn run(mut self) -> Document {
        debug!(len = self.buf.len(), "parse start");

        let start = self.consume_prolog(0).unwrap_or(0);
        self.parse_body(start);

        // the synthetic root keeps empty spans
        let root = self.dom.get_mut(ROOT);
        root.tag_span = Span::empty();
        root.body_span = Span::empty();

        debug!(
            len = self.buf.len(),
            elements = self.dom.element_count(),
            "parse done"
        );
        Document::from_parts(self.buf, self.dom, self.html, self.namespace_tag)
    }

    // --- prolog ---

    /// Consume a leading `<?name ...?>` or `<!name ...>` once at the start.
    /// The token never becomes a tree node.
    fn consume_prolog(&mut self, index: usize) -> Option<usize> {
        let i = self.skip_whitespace(index)?;
        if self.buf[i] != b'<' {
            return None;
        }
        let parent = self.current;
        let mut j = i + 1;

        if self.in_bound(j) && self.buf[j] != b'?' {
            let result = self.parse_doctype(j);
            self.current = parent;
            return result;
        }

        j += 1;
        let after = self.parse_tag_name(j);
        let node = self.current;
        self.current = parent;
        let after = after?;

        if self.in_bound(after + 1) && self.buf[after] == b'?' && self.buf[after + 1] == b'>' {
            self.namespace_tag = Some(node);
        }
        Some(after + 2)
    }

    /// `<!DOCTYPE ...>` and friends; sets the `html` flag for
    /// `doctype html=html` (ASCII case-insensitive)
    fn parse_doctype(&mut self, index: usize) -> Option<usize> {
        if self.buf[index] != b'!' {
            return None;
        }
        let after = self.parse_tag_name(index + 1)?;
        if !self.in_bound(after) {
            return None;
        }
        if self.buf[after] == b'>' {
            self.namespace_tag = Some(self.current);
        }

        let node = self.dom.get(self.current);
        self.html = node.name.eq_ignore_ascii_case("doctype")
            && node
                .attribute("html")
                .is_some_and(|v| v.eq_ignore_ascii_case("html"));

        Some(after + 1)
    }

    // --- body ---

    /// Parse text, comments and child elements until the close tag of the
    /// current element. Returns the index after `</name>`, or `None` at end
    /// of input (the current element's body is then left unterminated).
    fn parse_body(&mut self, start: usize) -> Option<usize> {
        if !self.in_bound(start) {
            self.dom.get_mut(self.current).body_span = Span::unterminated(start);
            return None;
        }

        let offset = start;
        let name = self.dom.get(self.current).name.clone();
        let mut index = start;

        while let Some(lt) = self.scan_to_lt(index) {
            if let Some(next) = self.consume_comment(lt) {
                index = next;
                continue;
            }
            if let Some(after_close) = self.parse_tag_end(lt, &name) {
                self.dom.get_mut(self.current).body_span = Span::new(offset, lt);
                return Some(after_close);
            }
            if let Some(next) = self.consume_tag(lt) {
                index = next;
                continue;
            }
            index = lt + 1;
        }

        self.dom.get_mut(self.current).body_span = Span::unterminated(offset);
        None
    }

    /// Match `</name>` exactly at `index`, returning the index after `>`
    fn parse_tag_end(&mut self, index: usize, name: &str) -> Option<usize> {
        if !self.in_bound(index + 1) || self.buf[index] != b'<' || self.buf[index + 1] != b'/' {
            return None;
        }
        let mut z = index + 2;
        for &b in name.as_bytes() {
            if !self.in_bound(z) || self.buf[z] != b {
                return None;
            }
            z += 1;
        }
        if !self.in_bound(z) || self.buf[z] != b'>' {
            return None;
        }
        Some(z + 1)
    }

    // --- elements ---

    /// Consume one element at `index` (after optional whitespace).
    ///
    /// The offset-map cache is consulted first: a hit with a live end means
    /// a previous scan already completed this subtree, so it is adopted into
    /// the current parent wholesale; a hit with an unterminated end would
    /// loop and fails instead.
    fn consume_tag(&mut self, index: usize) -> Option<usize> {
        let offset = self.skip_whitespace(index)?;
        let parent = self.current;
        if self.buf[offset] != b'<' {
            return None;
        }

        if let Some(cached) = self.dom.offset_at(offset) {
            if self.dom.get(cached).tag_span.is_unterminated() {
                return None;
            }
            let mut resume = self.dom.get(cached).tag_span.end;
            self.dom.get_mut(parent).children.push(cached);
            if let Some(after_ws) = self.skip_whitespace(resume) {
                resume = after_ws;
            }
            return Some(resume);
        }

        let after_name = match self.parse_tag_name(offset + 1) {
            Some(i) => i,
            None => {
                self.current = parent;
                return None;
            }
        };
        let node = self.current;

        let resume;
        if is_self_closing(&self.dom.get(node).name) {
            let Some(end) = self.handle_selfclosing(after_name) else {
                self.current = parent;
                return None;
            };
            self.dom.get_mut(node).tag_span = Span::new(offset, end);
            self.dom.insert_offset(offset, node);
            self.dom.index_element(node);
            resume = end;
        } else if self.in_bound(after_name + 1)
            && self.buf[after_name] == b'/'
            && self.buf[after_name + 1] == b'>'
        {
            self.dom.get_mut(node).tag_span = Span::new(offset, after_name + 2);
            self.dom.insert_offset(offset, node);
            self.dom.index_element(node);
            resume = after_name + 2;
        } else if self.in_bound(after_name) && self.buf[after_name] == b'>' {
            self.dom.insert_offset(offset, node);
            self.dom.index_element(node);

            let closed = if self.dom.get(node).name == "script" {
                self.script_body(after_name)
            } else {
                self.parse_body(after_name + 1)
            };
            match closed {
                Some(end) => {
                    self.dom.get_mut(node).tag_span = Span::new(offset, end);
                    resume = self.skip_whitespace(end).unwrap_or(end);
                }
                None => {
                    // salvage: keep the indexed entry, drop the provisional
                    // children and continue as text after the '<'
                    let failed = self.dom.get_mut(node);
                    failed.tag_span = Span::unterminated(offset);
                    failed.body_span = Span::unterminated(after_name + 1);
                    failed.children.clear();
                    self.current = parent;
                    return Some(offset + 1);
                }
            }
        } else {
            self.current = parent;
            return None;
        }

        self.dom.get_mut(parent).children.push(node);
        self.current = parent;
        Some(resume)
    }

    /// For tags in the self-closing set: accept `>` or `/>` after the
    /// attribute region
    fn handle_selfclosing(&mut self, index: usize) -> Option<usize> {
        let i = self.skip_whitespace(index)?;
        if self.buf[i] == b'>' {
            return Some(i + 1);
        }
        if self.in_bound(i + 1) && self.buf[i] == b'/' && self.buf[i + 1] == b'>' {
            return Some(i + 2);
        }
        None
    }

    /// Skip a `<script>` body without parsing it: scan for the literal
    /// `</script`, optional whitespace, `>`
    fn script_body(&mut self, gt: usize) -> Option<usize> {
        let body_start = gt + 1;
        let mut i = body_start;
        loop {
            i = self.scan_to_lt(i)?;
            if !self.in_bound(i + 8) {
                return None;
            }
            if &self.buf[i..i + 8] == b"</script" {
                if let Some(k) = self.skip_whitespace(i + 8) {
                    if self.buf[k] == b'>' {
                        self.dom.get_mut(self.current).body_span = Span::new(body_start, i);
                        return Some(k + 1);
                    }
                }
            }
            i += 1;
        }
    }

    // --- tag names and attributes ---

    /// Parse `name` or `prefix:name` plus the attribute region. Creates the
    /// element node and leaves it as `current`; returns the index of the tag
    /// terminator (`>`, `/`, `?`) or the bare index after the name.
    fn parse_tag_name(&mut self, index: usize) -> Option<usize> {
        if !self.in_bound(index) || !is_alpha(self.buf[index]) {
            return None;
        }
        let start = index;
        let mut end = self.skip_ident(index)?;

        let (namespace, name) = if self.in_bound(end) && self.buf[end] == b':' {
            let prefix = self.lossy(start..end);
            let local_start = end + 1;
            end = self.skip_ident(local_start)?;
            (prefix, self.lossy(local_start..end))
        } else {
            (String::new(), self.lossy(start..end))
        };

        let id = self.dom.push_node(Element::new(name, namespace));
        self.current = id;

        let mut cur = self.skip_whitespace(end)?;
        if cur != end {
            cur = self.parse_attributes(cur)?;
        }
        Some(cur)
    }

    /// Parse the attribute region of one tag.
    ///
    /// Grammar per iteration: a quoted literal is attempted first, then an
    /// identifier. `name="value"` stores the pair, a bare name stores
    /// itself, `xmlns:prefix="uri"` goes to the namespace table instead.
    /// Returns the index of the terminator; any malformed attribute
    /// abandons the whole tag.
    fn parse_attributes(&mut self, mut index: usize) -> Option<usize> {
        loop {
            if !self.in_bound(index) {
                return None;
            }
            let b = self.buf[index];
            if b == b'>'
                || b == b'?'
                || (b == b'/' && self.in_bound(index + 1) && self.buf[index + 1] == b'>')
            {
                return self.finish_attributes(index);
            }

            let (mut cur, token) = if self.at_literal_opener(index) {
                let (after, body) = self.scan_literal(index)?;
                (after, self.lossy(body))
            } else {
                let end = self.skip_ident(index)?;
                (end, self.lossy(index..end))
            };
            if !self.in_bound(cur) {
                return None;
            }

            if self.buf[cur] == b'>' {
                // bare attribute at the end of the tag
                self.dom
                    .get_mut(self.current)
                    .attributes
                    .insert(token.clone(), token);
                return self.finish_attributes(cur);
            }

            let mut ns_prefix = None;
            if token == "xmlns" && self.buf[cur] == b':' {
                let prefix_start = cur + 1;
                cur = self.skip_ident(prefix_start)?;
                if !self.in_bound(cur) {
                    return None;
                }
                ns_prefix = Some(self.lossy(prefix_start..cur));
            }

            if super::scanner::is_whitespace(self.buf[cur]) {
                self.dom
                    .get_mut(self.current)
                    .attributes
                    .insert(token.clone(), token);
                index = self.skip_whitespace(cur + 1)?;
                continue;
            }

            if self.buf[cur] != b'=' || !self.in_bound(cur + 1) {
                return None;
            }
            let (after, body) = self.scan_literal(cur + 1)?;
            let value = self.lossy(body);
            match ns_prefix {
                Some(prefix) => self.dom.set_namespace(prefix, value),
                None => {
                    self.dom
                        .get_mut(self.current)
                        .attributes
                        .insert(token, value);
                }
            }

            index = self.skip_whitespace(after)?;
        }
    }

    /// Single exit point of the attribute region: index the `class` tokens
    /// and the `id` of the current element
    fn finish_attributes(&mut self, index: usize) -> Option<usize> {
        let id = self.current;
        let class = self.dom.get(id).attribute("class").map(str::to_string);
        if let Some(class) = class {
            self.dom.add_class_keys(id, &class);
        }
        let id_value = self.dom.get(id).attribute("id").map(str::to_string);
        if let Some(id_value) = id_value {
            self.dom.add_id_key(&id_value, id);
        }
        Some(index)
    }

    fn lossy(&self, range: std::ops::Range<usize>) -> String {
        String::from_utf8_lossy(&self.buf[range]).into_owned()
    }
}
