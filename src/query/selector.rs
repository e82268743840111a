//! Selector parsing and the compile cache
//!
//! Grammar: qualifier groups (`tag`, `.class`, `#id`, `*`, concatenated =
//! AND) joined by whitespace (descendant) or `>` (direct child). Parsed
//! selectors are cached in a process-wide LRU so repeated queries skip
//! re-parsing.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::debug;

/// Global LRU cache of parsed selectors
static SELECTOR_CACHE: Mutex<Option<LruCache<String, Selector>>> = Mutex::new(None);

/// Cache capacity - plenty for typical query vocabularies
const CACHE_CAPACITY: usize = 256;

/// One atomic selector test
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Qualifier {
    /// Match by tag name
    Tag(String),
    /// Whole-token membership in the `class` attribute
    Class(String),
    /// Exact `id` attribute match
    Id(String),
    /// Match any element
    Star,
}

/// How a group relates to the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    /// Whitespace: anywhere in the subtree
    Descendant,
    /// `>`: direct children only
    Child,
}

/// A maximal run of qualifiers; all must match one element
#[derive(Debug, Clone)]
pub(crate) struct Group {
    pub combinator: Combinator,
    pub qualifiers: Vec<Qualifier>,
}

/// A parsed selector. No groups means the empty selector, which matches
/// nothing.
#[derive(Debug, Clone)]
pub(crate) struct Selector {
    pub groups: Vec<Group>,
}

/// Parse a selector string (with caching)
pub(crate) fn compile(selector: &str) -> Result<Selector, String> {
    {
        let mut guard = SELECTOR_CACHE.lock().unwrap();
        let cache = guard.get_or_insert_with(|| {
            LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap())
        });
        if let Some(parsed) = cache.get(selector) {
            return Ok(parsed.clone());
        }
    }

    debug!(selector, "selector cache miss");
    let parsed = parse(selector)?;

    {
        let mut guard = SELECTOR_CACHE.lock().unwrap();
        let cache = guard.get_or_insert_with(|| {
            LruCache::new(NonZeroUsize::new(CACHE_CAPACITY).unwrap())
        });
        cache.put(selector.to_string(), parsed.clone());
    }

    Ok(parsed)
}

/// Parse a selector string without caching
pub(crate) fn parse(selector: &str) -> Result<Selector, String> {
    let bytes = selector.as_bytes();
    let mut i = 0;

    skip_spaces(bytes, &mut i);
    if i >= bytes.len() {
        return Ok(Selector { groups: Vec::new() });
    }
    if bytes[i] == b'>' {
        return Err("begins with a combinator".to_string());
    }

    let mut groups = Vec::new();
    let mut combinator = Combinator::Descendant;
    loop {
        let qualifiers = parse_group(bytes, &mut i)?;
        groups.push(Group {
            combinator,
            qualifiers,
        });

        let spaces = skip_spaces(bytes, &mut i);
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == b'>' {
            combinator = Combinator::Child;
            i += 1;
            skip_spaces(bytes, &mut i);
            if i >= bytes.len() {
                return Err("ends with a combinator".to_string());
            }
        } else if spaces > 0 {
            combinator = Combinator::Descendant;
        } else {
            return Err(format!("unsupported character {:?}", bytes[i] as char));
        }
    }

    Ok(Selector { groups })
}

fn parse_group(bytes: &[u8], i: &mut usize) -> Result<Vec<Qualifier>, String> {
    let mut qualifiers = Vec::new();
    while *i < bytes.len() {
        match bytes[*i] {
            b'*' => {
                *i += 1;
                qualifiers.push(Qualifier::Star);
            }
            b'.' => {
                *i += 1;
                let name = take_name(bytes, i);
                if name.is_empty() {
                    return Err("empty class qualifier".to_string());
                }
                qualifiers.push(Qualifier::Class(name));
            }
            b'#' => {
                *i += 1;
                let name = take_name(bytes, i);
                if name.is_empty() {
                    return Err("empty id qualifier".to_string());
                }
                qualifiers.push(Qualifier::Id(name));
            }
            c if is_qualifier_char(c) => {
                qualifiers.push(Qualifier::Tag(take_name(bytes, i)));
            }
            _ => break,
        }
    }
    if qualifiers.is_empty() {
        return Err("expected a qualifier".to_string());
    }
    // an id pins at most one element, so test it first
    qualifiers.sort_by_key(|q| !matches!(q, Qualifier::Id(_)));
    Ok(qualifiers)
}

fn take_name(bytes: &[u8], i: &mut usize) -> String {
    let start = *i;
    while *i < bytes.len() && is_qualifier_char(bytes[*i]) {
        *i += 1;
    }
    String::from_utf8_lossy(&bytes[start..*i]).into_owned()
}

fn skip_spaces(bytes: &[u8], i: &mut usize) -> usize {
    let start = *i;
    while *i < bytes.len() && bytes[*i] == b' ' {
        *i += 1;
    }
    *i - start
}

#[inline]
fn is_qualifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'-' || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_group() {
        let sel = parse("div.foo#bar").unwrap();
        assert_eq!(sel.groups.len(), 1);
        // id reordered to the front, remaining order preserved
        assert_eq!(
            sel.groups[0].qualifiers,
            vec![
                Qualifier::Id("bar".into()),
                Qualifier::Tag("div".into()),
                Qualifier::Class("foo".into()),
            ]
        );
    }

    #[test]
    fn test_qualifier_reordering() {
        let sel = parse(".rofl#a > a").unwrap();
        assert_eq!(
            sel.groups[0].qualifiers,
            vec![Qualifier::Id("a".into()), Qualifier::Class("rofl".into())]
        );
    }

    #[test]
    fn test_combinators() {
        let sel = parse("#a.rofl > b a > e.lol").unwrap();
        assert_eq!(sel.groups.len(), 4);
        assert_eq!(sel.groups[1].combinator, Combinator::Child);
        assert_eq!(sel.groups[2].combinator, Combinator::Descendant);
        assert_eq!(sel.groups[3].combinator, Combinator::Child);
    }

    #[test]
    fn test_empty_selector() {
        assert!(parse("").unwrap().groups.is_empty());
        assert!(parse("   ").unwrap().groups.is_empty());
    }

    #[test]
    fn test_star() {
        let sel = parse("*").unwrap();
        assert_eq!(sel.groups[0].qualifiers, vec![Qualifier::Star]);
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(parse("> a").is_err());
        assert!(parse("a + b").is_err());
        assert!(parse("a >").is_err());
        assert!(parse(".").is_err());
        assert!(parse("a[href]").is_err());
    }

    #[test]
    fn test_compile_cache_round_trip() {
        let first = compile("div.cached-case").unwrap();
        let second = compile("div.cached-case").unwrap();
        assert_eq!(first.groups.len(), second.groups.len());
        assert_eq!(first.groups[0].qualifiers, second.groups[0].qualifiers);
    }
}
