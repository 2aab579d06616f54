//! Component-level name patterns
//!
//! Patterns are written over name components rather than characters:
//!
//! ```text
//! <a>          one component matching the regex `a` in full (URI-escaped text)
//! <>           any single component
//! [<a><b>]     one component matching any member
//! [^<KEY>]     one component matching no member
//! ( ... )      capture group, numbered by its opening parenthesis
//! * + ? {n} {n,} {,m} {n,m}
//! ^ ... $      anchors; an unanchored side may match anywhere
//! ```
//!
//! Matching is backtracking and greedy. A successful match yields a
//! [`RegexMatch`] value owned by the caller, so a compiled [`NameRegex`] can be
//! shared freely across threads.

mod expand;

pub use expand::{ExpandTemplate, RegexMatch};

use crate::errors::{Result, TrustError};
use crate::name::{Component, Name};
use std::fmt;

pub(crate) type Spans = Vec<Option<(usize, usize)>>;

/// Matcher for a single component
#[derive(Clone)]
enum ComponentMatcher {
    Any,
    Pattern(regex::Regex),
}

impl ComponentMatcher {
    fn compile(inner: &str) -> Result<Self> {
        if inner.is_empty() {
            return Ok(Self::Any);
        }
        regex::Regex::new(&format!("^(?:{inner})$"))
            .map(Self::Pattern)
            .map_err(|e| TrustError::invalid_pattern(format!("bad component regex `{inner}`: {e}")))
    }

    fn literal(component: &Component) -> Result<Self> {
        Self::compile(&regex::escape(&component.to_uri()))
    }

    fn matches(&self, component: &Component) -> bool {
        match self {
            Self::Any => true,
            Self::Pattern(re) => re.is_match(&component.to_uri()),
        }
    }
}

#[derive(Clone)]
enum Atom {
    Component(ComponentMatcher),
    Set {
        negated: bool,
        members: Vec<ComponentMatcher>,
    },
    Group {
        index: usize,
        body: Vec<Item>,
    },
}

#[derive(Clone)]
struct Item {
    atom: Atom,
    min: usize,
    max: Option<usize>,
}

/// A compiled component-level name pattern
#[derive(Clone)]
pub struct NameRegex {
    source: String,
    items: Vec<Item>,
    group_count: usize,
    anchored_start: bool,
    anchored_end: bool,
}

impl NameRegex {
    /// Compile a pattern
    pub fn new(pattern: &str) -> Result<Self> {
        let mut body = pattern.trim();
        let anchored_start = body.starts_with('^');
        if anchored_start {
            body = &body[1..];
        }
        let anchored_end = body.ends_with('$');
        if anchored_end {
            body = &body[..body.len() - 1];
        }

        let mut parser = Parser {
            pattern,
            input: body.as_bytes(),
            pos: 0,
            group_count: 0,
        };
        let items = parser.parse_sequence(false)?;

        Ok(Self {
            source: pattern.to_string(),
            items,
            group_count: parser.group_count,
            anchored_start,
            anchored_end,
        })
    }

    /// Pattern matching exactly `name` (anchored on both ends)
    pub fn from_name(name: &Name) -> Result<Self> {
        let items = name
            .iter()
            .map(|component| {
                Ok(Item {
                    atom: Atom::Component(ComponentMatcher::literal(component)?),
                    min: 1,
                    max: Some(1),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let source = name.iter().fold(String::from("^"), |mut acc, c| {
            acc.push('<');
            acc.push_str(&regex::escape(&c.to_uri()));
            acc.push('>');
            acc
        }) + "$";

        Ok(Self {
            source,
            items,
            group_count: 0,
            anchored_start: true,
            anchored_end: true,
        })
    }

    /// Source text of the pattern
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of capture groups
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Whether `name` matches
    pub fn is_match(&self, name: &Name) -> bool {
        self.captures(name).is_some()
    }

    /// Match `name` and return its capture groups
    pub fn captures(&self, name: &Name) -> Option<RegexMatch> {
        let components = name.components();
        let matcher = Matcher { components };
        let last_start = if self.anchored_start {
            0
        } else {
            components.len()
        };

        for start in 0..=last_start {
            let mut spans: Spans = vec![None; self.group_count + 1];
            let anchored_end = self.anchored_end;
            let mut accept = |end: usize, spans: &mut Spans| {
                if anchored_end && end != components.len() {
                    return false;
                }
                spans[0] = Some((start, end));
                true
            };
            if matcher.match_items(&self.items, start, &mut spans, &mut accept) {
                tracing::trace!(pattern = %self.source, name = %name, "name regex matched");
                return Some(RegexMatch::new(name.clone(), spans));
            }
        }
        None
    }
}

impl fmt::Debug for NameRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NameRegex({})", self.source)
    }
}

impl fmt::Display for NameRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl PartialEq for NameRegex {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for NameRegex {}

struct Parser<'a> {
    pattern: &'a str,
    input: &'a [u8],
    pos: usize,
    group_count: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, what: &str) -> TrustError {
        TrustError::invalid_pattern(format!("{what} in `{}`", self.pattern))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn parse_sequence(&mut self, in_group: bool) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        loop {
            let atom = match self.peek() {
                None if in_group => return Err(self.error("unbalanced `(`")),
                None => break,
                Some(b')') if in_group => {
                    self.pos += 1;
                    break;
                }
                Some(b')') => return Err(self.error("unbalanced `)`")),
                Some(b'<') => Atom::Component(self.parse_component()?),
                Some(b'[') => self.parse_set()?,
                Some(b'(') => {
                    self.pos += 1;
                    self.group_count += 1;
                    let index = self.group_count;
                    let body = self.parse_sequence(true)?;
                    Atom::Group { index, body }
                }
                Some(c) if c.is_ascii_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                Some(c) => {
                    return Err(self.error(&format!("unexpected `{}` at {}", c as char, self.pos)))
                }
            };
            let (min, max) = self.parse_repeat()?;
            items.push(Item { atom, min, max });
        }
        Ok(items)
    }

    fn parse_component(&mut self) -> Result<ComponentMatcher> {
        // at '<'
        let start = self.pos + 1;
        let end = self.input[start..]
            .iter()
            .position(|b| *b == b'>')
            .map(|offset| start + offset)
            .ok_or_else(|| self.error("unterminated `<`"))?;
        let inner = std::str::from_utf8(&self.input[start..end])
            .map_err(|_| self.error("non-utf8 component pattern"))?;
        self.pos = end + 1;
        ComponentMatcher::compile(inner)
    }

    fn parse_set(&mut self) -> Result<Atom> {
        self.pos += 1;
        let negated = self.peek() == Some(b'^');
        if negated {
            self.pos += 1;
        }
        let mut members = Vec::new();
        loop {
            match self.peek() {
                Some(b'<') => members.push(self.parse_component()?),
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("malformed component set")),
            }
        }
        if members.is_empty() {
            return Err(self.error("empty component set"));
        }
        Ok(Atom::Set { negated, members })
    }

    fn parse_repeat(&mut self) -> Result<(usize, Option<usize>)> {
        let repeat = match self.peek() {
            Some(b'*') => (0, None),
            Some(b'+') => (1, None),
            Some(b'?') => (0, Some(1)),
            Some(b'{') => return self.parse_bounds(),
            _ => return Ok((1, Some(1))),
        };
        self.pos += 1;
        Ok(repeat)
    }

    fn parse_bounds(&mut self) -> Result<(usize, Option<usize>)> {
        let start = self.pos + 1;
        let end = self.input[start..]
            .iter()
            .position(|b| *b == b'}')
            .map(|offset| start + offset)
            .ok_or_else(|| self.error("unterminated `{`"))?;
        let text = std::str::from_utf8(&self.input[start..end])
            .map_err(|_| self.error("non-utf8 repeat bounds"))?;
        self.pos = end + 1;

        let parse = |s: &str| -> Result<Option<usize>> {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<usize>()
                .map(Some)
                .map_err(|_| self.error(&format!("bad repeat bound `{s}`")))
        };

        let (min, max) = match text.split_once(',') {
            None => {
                let exact = parse(text)?.ok_or_else(|| self.error("empty repeat bound"))?;
                (exact, Some(exact))
            }
            Some((lo, hi)) => (parse(lo)?.unwrap_or(0), parse(hi)?),
        };
        if max.is_some_and(|max| max < min) {
            return Err(self.error(&format!("repeat bounds {{{text}}} are inverted")));
        }
        Ok((min, max))
    }
}

struct Matcher<'a> {
    components: &'a [Component],
}

impl<'a> Matcher<'a> {
    fn match_items(
        &self,
        items: &[Item],
        pos: usize,
        spans: &mut Spans,
        k: &mut dyn FnMut(usize, &mut Spans) -> bool,
    ) -> bool {
        match items.split_first() {
            None => k(pos, spans),
            Some((item, rest)) => self.match_repeat(item, rest, pos, 0, spans, k),
        }
    }

    fn match_repeat(
        &self,
        item: &Item,
        rest: &[Item],
        pos: usize,
        count: usize,
        spans: &mut Spans,
        k: &mut dyn FnMut(usize, &mut Spans) -> bool,
    ) -> bool {
        if item.max.map_or(true, |max| count < max) {
            // Zero-width iterations only count while the minimum is unmet.
            let matched = self.match_atom(&item.atom, pos, spans, &mut |next, spans| {
                (next > pos || count < item.min)
                    && self.match_repeat(item, rest, next, count + 1, spans, k)
            });
            if matched {
                return true;
            }
        }
        count >= item.min && self.match_items(rest, pos, spans, k)
    }

    fn match_atom(
        &self,
        atom: &Atom,
        pos: usize,
        spans: &mut Spans,
        k: &mut dyn FnMut(usize, &mut Spans) -> bool,
    ) -> bool {
        match atom {
            Atom::Component(matcher) => match self.components.get(pos) {
                Some(component) if matcher.matches(component) => k(pos + 1, spans),
                _ => false,
            },
            Atom::Set { negated, members } => match self.components.get(pos) {
                Some(component) if members.iter().any(|m| m.matches(component)) != *negated => {
                    k(pos + 1, spans)
                }
                _ => false,
            },
            Atom::Group { index, body } => {
                let index = *index;
                self.match_items(body, pos, spans, &mut |end, spans| {
                    let previous = spans[index];
                    spans[index] = Some((pos, end));
                    if k(end, spans) {
                        true
                    } else {
                        spans[index] = previous;
                        false
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    fn re(pattern: &str) -> NameRegex {
        NameRegex::new(pattern).unwrap()
    }

    #[test]
    fn test_anchored_component_match() {
        let r = re("^<a><b>$");
        assert!(r.is_match(&name("/a/b")));
        assert!(!r.is_match(&name("/a/b/c")));
        assert!(!r.is_match(&name("/x/a/b")));
    }

    #[test]
    fn test_unanchored_matches_anywhere() {
        let r = re("<KEY>");
        assert!(r.is_match(&name("/a/KEY/1")));
        assert!(!r.is_match(&name("/a/b")));
        assert!(re("^<a>").is_match(&name("/a/b/c")));
        assert!(re("<c>$").is_match(&name("/a/b/c")));
        assert!(!re("<b>$").is_match(&name("/a/b/c")));
    }

    #[test]
    fn test_component_regex_is_full_match() {
        let r = re("^<ksk-.*>$");
        assert!(r.is_match(&name("/ksk-123")));
        assert!(!r.is_match(&name("/dsk-123")));
        assert!(!re("^<ks>$").is_match(&name("/ksk")));
    }

    #[test]
    fn test_component_sets() {
        let r = re("^[^<KEY>]*<KEY><>$");
        assert!(r.is_match(&name("/a/b/KEY/1")));
        assert!(!r.is_match(&name("/a/KEY/b/KEY/1")));
        assert!(re("^[<a><b>]+$").is_match(&name("/a/b/a")));
        assert!(!re("^[<a><b>]+$").is_match(&name("/a/c")));
    }

    #[test]
    fn test_repeat_bounds() {
        let r = re("^<>{2,3}$");
        assert!(!r.is_match(&name("/a")));
        assert!(r.is_match(&name("/a/b")));
        assert!(r.is_match(&name("/a/b/c")));
        assert!(!r.is_match(&name("/a/b/c/d")));
        assert!(re("^<a>?<b>$").is_match(&name("/b")));
        assert!(re("^<>{,1}$").is_match(&Name::new()));
    }

    #[test]
    fn test_groups_capture_component_ranges() {
        let r = re("^([^<KEY>]*)<KEY>(<>*)$");
        let m = r.captures(&name("/a/b/KEY/1")).unwrap();
        assert_eq!(m.group(1), Some(name("/a/b")));
        assert_eq!(m.group(2), Some(name("/1")));
        assert_eq!(m.group(0), Some(name("/a/b/KEY/1")));
    }

    #[test]
    fn test_nested_groups_number_by_open_paren() {
        let r = re("^(<a>(<b>))<c>$");
        let m = r.captures(&name("/a/b/c")).unwrap();
        assert_eq!(m.group(1), Some(name("/a/b")));
        assert_eq!(m.group(2), Some(name("/b")));
    }

    #[test]
    fn test_greedy_with_backtracking() {
        let r = re("^(<>*)<KEY><>$");
        let m = r.captures(&name("/a/KEY/b/KEY/1")).unwrap();
        assert_eq!(m.group(1), Some(name("/a/KEY/b")));
    }

    #[test]
    fn test_zero_width_repeat_terminates() {
        let r = re("^(<>*)*$");
        assert!(r.is_match(&name("/a/b")));
        assert!(r.is_match(&Name::new()));
    }

    #[test]
    fn test_from_name_is_exact() {
        let r = NameRegex::from_name(&name("/a/b.c")).unwrap();
        assert!(r.is_match(&name("/a/b.c")));
        assert!(!r.is_match(&name("/a/bxc")));
        assert!(!r.is_match(&name("/a/b.c/d")));
    }

    #[test]
    fn test_malformed_patterns_rejected() {
        for bad in ["^<a", "^(<a>", "^<a>)", "[]", "<a>{3,1}", "abc", "<(>"] {
            assert!(NameRegex::new(bad).is_err(), "{bad} should not compile");
        }
    }
}
