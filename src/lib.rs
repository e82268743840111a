//! parseur - permissive streaming HTML/XML parsing with indexed queries
//!
//! Strategies:
//! - [`Document::parse`] / [`Document::parse_escaped`]: whole-buffer parse
//! - [`stream::parse_streaming`]: parse while a producer is still delivering
//! - [`Document::query`]: CSS-style selector queries over inverted indices
//!
//! The parser is deliberately lenient: malformed markup never fails a
//! parse. Elements that do not close are kept in the indices with an
//! [`UNTERMINATED`] span end and their completed subtrees are re-attached
//! one level up.
//!
//! ```
//! use parseur::Document;
//!
//! let doc = Document::parse(r#"<div id="m" class="box"><p>hi</p></div>"#);
//! let p = doc.query("#m.box > p").first().unwrap();
//! assert_eq!(p.inner_text(), "hi");
//! ```

mod core;
mod document;
mod index;
mod stream;
mod text;

pub mod query;

pub use crate::core::ChunkHook;
pub use document::{Document, ElementRef};
pub use index::{is_self_closing, Dom, Element, NodeId, Span, ROOT, SELF_CLOSING_TAGS, UNTERMINATED};
pub use query::parallel::query_all;
pub use query::Query;
pub use stream::{parse_streaming, ChunkFeeder, ParseHandle};

#[cfg(test)]
mod tests {
    use super::*;

    const CASES: &[&str] = &[
        "",
        "plain text only",
        "<div />",
        "<a><p></a></p><br/>",
        r#"<a class="rofl" id="a"><div></div><b><c><e><a><e></e><e class="lol">lol</e></a></e></c></b></a>"#,
        r#"<!DOCTYPE html><html><body><ul><li class="x y">1</li><li>2</li></ul></body></html>"#,
        "<a><b>hi</b><c>unfinished",
        r#"<x class="a rofl lol rofl"><script>"<y>"</script></x>"#,
    ];

    fn preorder<'a>(out: &mut Vec<ElementRef<'a>>, e: ElementRef<'a>) {
        for child in e.children() {
            out.push(child);
            preorder(out, child);
        }
    }

    fn tree_elements(doc: &Document) -> Vec<ElementRef<'_>> {
        let mut out = Vec::new();
        preorder(&mut out, doc.root());
        out
    }

    #[test]
    fn test_spans_are_ordered_or_unterminated() {
        for case in CASES {
            let doc = Document::parse(*case);
            for element in doc.elements() {
                let span = element.tag_span();
                assert!(
                    span.is_unterminated() || span.start < span.end,
                    "bad span {span:?} in {case:?}"
                );
                let body = element.body_span();
                assert!(body.is_unterminated() || body.start <= body.end);
            }
        }
    }

    #[test]
    fn test_index_keys_resolve_back() {
        for case in CASES {
            let doc = Document::parse(*case);
            for element in doc.elements() {
                for key in [element.name().to_string(), "*".to_string()] {
                    assert!(
                        doc.get_tags(&key).contains(&element),
                        "{key:?} does not resolve back in {case:?}"
                    );
                }
                if let Some(class) = element.attribute("class") {
                    for token in class.split(' ').filter(|t| !t.is_empty()) {
                        assert!(doc.get_tags(&format!(".{token}")).contains(&element));
                    }
                }
                if let Some(id) = element.attribute("id") {
                    let owners = doc.get_tags(&format!("#{id}"));
                    assert_eq!(owners.len(), 1);
                    assert_eq!(owners[0].attribute("id"), Some(id));
                }
            }
        }
    }

    #[test]
    fn test_preorder_offsets_monotonic() {
        for case in CASES {
            let doc = Document::parse(*case);
            let mut last = 0;
            for element in tree_elements(&doc) {
                let start = element.tag_span().start;
                assert!(start >= last, "offset went backwards in {case:?}");
                last = start;
            }
        }
    }

    #[test]
    fn test_wildcard_counts_tree() {
        for case in CASES {
            let doc = Document::parse(*case);
            let in_tree = tree_elements(&doc).len();
            let salvaged = doc
                .elements()
                .iter()
                .filter(|e| !e.is_closed())
                .count();
            // every indexed element is either in the tree or a salvaged
            // open tag whose children were re-attached one level up
            assert_eq!(doc.element_count(), in_tree + salvaged, "in {case:?}");
        }
    }

    #[test]
    fn test_attribute_value_round_trip() {
        for value in ["v", "hello world", "a-b_c.d", "{json: 1}", ""] {
            let doc = Document::parse(format!(r#"<x a="{value}">"#));
            assert_eq!(doc.first("x").unwrap().attribute("a"), Some(value));
        }
    }

    #[test]
    fn test_class_tokenization_scenario() {
        let doc = Document::parse(r#"<x class="a rofl lol rofl">"#);
        let x = doc.first("x").unwrap();
        for key in [".a", ".rofl", ".lol"] {
            assert_eq!(doc.get_tags(key), vec![x], "key {key}");
        }
    }

    #[test]
    fn test_self_closing_set_is_exposed() {
        assert_eq!(SELF_CLOSING_TAGS.len(), 14);
        assert!(is_self_closing("wbr"));
    }
}
