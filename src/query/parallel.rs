//! Parallel evaluation of multiple selectors
//!
//! The document is immutable after the parse, so independent queries can
//! fan out across rayon workers.

use crate::document::{Document, ElementRef};
use rayon::prelude::*;

/// Evaluate several selectors against one document in parallel, returning
/// the result sets in input order
pub fn query_all<'a>(doc: &'a Document, selectors: &[&str]) -> Vec<Vec<ElementRef<'a>>> {
    selectors
        .par_iter()
        .map(|selector| doc.query(selector).get())
        .collect()
}
