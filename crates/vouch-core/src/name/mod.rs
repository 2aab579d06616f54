//! Hierarchical names
//!
//! A [`Name`] is an ordered sequence of opaque [`Component`]s. Names are
//! values: every operation that would change a name returns a new one.

mod component;

pub use component::Component;

use crate::errors::{Result, TrustError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered sequence of opaque binary components
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    /// The empty name `/`
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a name from components
    pub fn from_components(components: impl IntoIterator<Item = Component>) -> Self {
        Self {
            components: components.into_iter().collect(),
        }
    }

    /// Parse a URI such as `/a/b%00/c` (an `ndn:` scheme prefix is accepted)
    pub fn parse(uri: &str) -> Result<Self> {
        let trimmed = uri.trim();
        let path = trimmed.strip_prefix("ndn:").unwrap_or(trimmed);
        if path.starts_with("//") {
            return Err(TrustError::invalid_name(format!(
                "authority section is not supported in `{uri}`"
            )));
        }
        let components = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(Component::from_uri)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { components })
    }

    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether this is the empty name
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Component at `index`; negative indices count from the end
    pub fn get(&self, index: isize) -> Option<&Component> {
        let resolved = if index < 0 {
            self.components.len().checked_sub(index.unsigned_abs())?
        } else {
            index as usize
        };
        self.components.get(resolved)
    }

    /// All components in order
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Iterate components in order
    pub fn iter(&self) -> std::slice::Iter<'_, Component> {
        self.components.iter()
    }

    /// New name with `component` appended
    pub fn append(&self, component: impl Into<Component>) -> Self {
        let mut components = self.components.clone();
        components.push(component.into());
        Self { components }
    }

    /// New name with all of `suffix` appended
    pub fn join(&self, suffix: &Name) -> Self {
        let mut components = self.components.clone();
        components.extend(suffix.components.iter().cloned());
        Self { components }
    }

    /// First `count` components; a negative count drops that many from the end.
    /// Out-of-range counts clamp to the whole or empty name.
    pub fn prefix(&self, count: isize) -> Self {
        let len = self.components.len();
        let take = if count < 0 {
            len.saturating_sub(count.unsigned_abs())
        } else {
            (count as usize).min(len)
        };
        Self {
            components: self.components[..take].to_vec(),
        }
    }

    /// `count` components starting at `start` (clamped)
    pub fn sub_name(&self, start: usize, count: usize) -> Self {
        let start = start.min(self.components.len());
        let end = start.saturating_add(count).min(self.components.len());
        Self {
            components: self.components[start..end].to_vec(),
        }
    }

    /// Whether every component of `self` equals the corresponding component of `other`
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        self.components.len() <= other.components.len()
            && self
                .components
                .iter()
                .zip(other.components.iter())
                .all(|(a, b)| a == b)
    }

    /// Prefix relation that additionally requires `other` to be longer
    pub fn is_strict_prefix_of(&self, other: &Name) -> bool {
        self.components.len() < other.components.len() && self.is_prefix_of(other)
    }

    /// URI form, `/` for the empty name
    pub fn to_uri(&self) -> String {
        if self.components.is_empty() {
            return "/".to_string();
        }
        self.components.iter().fold(String::new(), |mut acc, c| {
            acc.push('/');
            acc.push_str(&c.to_uri());
            acc
        })
    }
}

impl FromStr for Name {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.to_uri())
    }
}

impl<'a> IntoIterator for &'a Name {
    type Item = &'a Component;
    type IntoIter = std::slice::Iter<'a, Component>;

    fn into_iter(self) -> Self::IntoIter {
        self.components.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(name("/a/b/c").len(), 3);
        assert_eq!(name("ndn:/a/b").to_uri(), "/a/b");
        assert_eq!(name("a/b/").to_uri(), "/a/b");
        assert_eq!(name("/").to_uri(), "/");
        assert!(Name::parse("//host/a").is_err());
    }

    #[test]
    fn test_negative_index_and_prefix() {
        let n = name("/a/b/c/d");
        assert_eq!(n.get(-1).unwrap().to_uri(), "d");
        assert_eq!(n.get(-4).unwrap().to_uri(), "a");
        assert!(n.get(-5).is_none());
        assert_eq!(n.prefix(-2), name("/a/b"));
        assert_eq!(n.prefix(-9), Name::new());
        assert_eq!(n.prefix(10), n);
        assert_eq!(n.sub_name(1, 2), name("/b/c"));
    }

    #[test]
    fn test_prefix_relations() {
        assert!(name("/a").is_prefix_of(&name("/a/b")));
        assert!(name("/a/b").is_prefix_of(&name("/a/b")));
        assert!(!name("/a/b").is_strict_prefix_of(&name("/a/b")));
        assert!(Name::new().is_prefix_of(&name("/x")));
        assert!(!name("/a/c").is_prefix_of(&name("/a/b/c")));
    }

    fn arb_name() -> impl Strategy<Value = Name> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..5)
            .prop_map(|parts| Name::from_components(parts.into_iter().map(Component::from)))
    }

    proptest! {
        #[test]
        fn prop_prefix_matches_componentwise_definition(p in arb_name(), n in arb_name()) {
            let componentwise = p.len() <= n.len()
                && p.iter().zip(n.iter()).all(|(a, b)| a == b);
            prop_assert_eq!(p.is_prefix_of(&n), componentwise);
            prop_assert_eq!(p.is_strict_prefix_of(&n), componentwise && p.len() < n.len());
        }

        #[test]
        fn prop_uri_round_trip(n in arb_name()) {
            prop_assert_eq!(Name::parse(&n.to_uri()).unwrap(), n);
        }
    }
}
