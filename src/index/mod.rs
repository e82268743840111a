//! Document index: element arena, offset map and inverted tag map
//!
//! Everything the parser commits lives here; the query engine and text
//! extraction only ever read from these structures.

pub mod dom;
pub mod node;
pub mod span;

pub use dom::Dom;
pub use node::{is_self_closing, Element, NodeId, ROOT, SELF_CLOSING_TAGS};
pub use span::{Span, UNTERMINATED};
