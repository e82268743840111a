//! Selector evaluation over the inverted indices
//!
//! The first group seeds the candidate set straight from the tag map, so a
//! `.foo` or `#foo` lookup costs one hash probe; the remaining qualifiers
//! of the group intersect-filter that sequence. Each following group
//! replaces the set via a descendant walk or a direct-child step.

use super::selector::{Combinator, Group, Qualifier, Selector};
use crate::document::Document;
use crate::index::NodeId;

/// Evaluate a parsed selector. With a seed set the whole selector acts as
/// combinator steps below the seed elements (subquery semantics).
pub(crate) fn evaluate(doc: &Document, selector: &Selector, seed: Option<&[NodeId]>) -> Vec<NodeId> {
    if selector.groups.is_empty() {
        return Vec::new();
    }

    let mut current;
    let steps: &[Group];
    match seed {
        Some(ids) => {
            current = ids.to_vec();
            steps = &selector.groups;
        }
        None => {
            let Some((first, rest)) = selector.groups.split_first() else {
                return Vec::new();
            };
            current = seed_from_index(doc, &first.qualifiers);
            steps = rest;
        }
    }

    for group in steps {
        if current.is_empty() {
            return Vec::new();
        }
        current = match group.combinator {
            Combinator::Descendant => descendants_matching(doc, &current, &group.qualifiers),
            Combinator::Child => children_matching(doc, &current, &group.qualifiers),
        };
    }
    current
}

/// Look the first qualifier up in the tag map and intersect-filter the rest
fn seed_from_index(doc: &Document, qualifiers: &[Qualifier]) -> Vec<NodeId> {
    let Some((first, rest)) = qualifiers.split_first() else {
        return Vec::new();
    };
    let base = doc.dom().get_tags(&index_key(first));
    if rest.is_empty() {
        base.to_vec()
    } else {
        base.iter()
            .copied()
            .filter(|&id| matches(doc, id, rest))
            .collect()
    }
}

fn index_key(qualifier: &Qualifier) -> String {
    match qualifier {
        Qualifier::Tag(name) => name.clone(),
        Qualifier::Class(class) => format!(".{class}"),
        Qualifier::Id(id) => format!("#{id}"),
        Qualifier::Star => "*".to_string(),
    }
}

/// Pre-order walk of every subtree, collecting matching descendants
fn descendants_matching(doc: &Document, set: &[NodeId], qualifiers: &[Qualifier]) -> Vec<NodeId> {
    let mut out = Vec::new();
    for &id in set {
        walk(doc, id, qualifiers, &mut out);
    }
    out
}

fn walk(doc: &Document, id: NodeId, qualifiers: &[Qualifier], out: &mut Vec<NodeId>) {
    for &child in &doc.dom().get(id).children {
        if matches(doc, child, qualifiers) {
            out.push(child);
        }
        walk(doc, child, qualifiers, out);
    }
}

/// Direct children of the set members that match the group
fn children_matching(doc: &Document, set: &[NodeId], qualifiers: &[Qualifier]) -> Vec<NodeId> {
    set.iter()
        .flat_map(|&id| doc.dom().get(id).children.iter().copied())
        .filter(|&child| matches(doc, child, qualifiers))
        .collect()
}

/// Compound qualifier match: every qualifier must hold
fn matches(doc: &Document, id: NodeId, qualifiers: &[Qualifier]) -> bool {
    let element = doc.dom().get(id);
    qualifiers.iter().all(|qualifier| match qualifier {
        Qualifier::Tag(name) => element.name == *name,
        Qualifier::Class(class) => element
            .attribute("class")
            .is_some_and(|attr| attr.split(' ').any(|token| token == class)),
        Qualifier::Id(id_value) => element.attribute("id") == Some(id_value.as_str()),
        Qualifier::Star => true,
    })
}
