//! Parsed trust schema configuration
//!
//! The policy engine never sees a file format. A loader turns the schema file
//! into an ordered tree of string leaves and nested sections and hands that
//! tree over; section factories then walk it with a [`Cursor`], which enforces
//! that recognized keys appear in the expected order.

mod refresh;

pub use refresh::{parse_refresh_period, DEFAULT_REFRESH_PERIOD};

use serde::{Deserialize, Serialize};
use vouch_core::{Result, TrustError};

/// A leaf value or a nested section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    /// String leaf
    Leaf(String),
    /// Nested section
    Section(ConfigSection),
}

/// Ordered list of key/value pairs; duplicate keys are allowed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigSection {
    entries: Vec<(String, ConfigValue)>,
}

impl ConfigSection {
    /// Empty section
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string leaf
    #[must_use]
    pub fn leaf(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .push((key.into(), ConfigValue::Leaf(value.into())));
        self
    }

    /// Append a nested section
    #[must_use]
    pub fn section(mut self, key: impl Into<String>, section: ConfigSection) -> Self {
        self.entries
            .push((key.into(), ConfigValue::Section(section)));
        self
    }

    /// Append an entry in place
    pub fn push(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.entries.push((key.into(), value));
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the section has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in declared order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Start an ordered walk; `context` names the section in error messages
    pub fn cursor<'a>(&'a self, context: &'a str) -> Cursor<'a> {
        Cursor {
            entries: &self.entries,
            pos: 0,
            context,
        }
    }
}

/// Ordered walk over one section
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    entries: &'a [(String, ConfigValue)],
    pos: usize,
    context: &'a str,
}

impl<'a> Cursor<'a> {
    /// Key of the next entry
    pub fn peek_key(&self) -> Option<&'a str> {
        self.entries.get(self.pos).map(|(k, _)| k.as_str())
    }

    /// Whether the next entry has `key`
    pub fn next_is(&self, key: &str) -> bool {
        self.peek_key().is_some_and(|k| k.eq_ignore_ascii_case(key))
    }

    /// Whether every entry has been consumed
    pub fn is_done(&self) -> bool {
        self.pos >= self.entries.len()
    }

    /// Consume the next entry if it is a leaf named `key`
    pub fn leaf(&mut self, key: &str) -> Result<&'a str> {
        match self.entries.get(self.pos) {
            Some((k, ConfigValue::Leaf(value))) if k.eq_ignore_ascii_case(key) => {
                self.pos += 1;
                Ok(value.as_str())
            }
            _ => Err(self.expected(key)),
        }
    }

    /// Consume the next entry if it is a leaf named `key`; otherwise leave it
    pub fn optional_leaf(&mut self, key: &str) -> Option<&'a str> {
        if self.next_is(key) {
            self.leaf(key).ok()
        } else {
            None
        }
    }

    /// Consume the next entry if it is a section named `key`
    pub fn section(&mut self, key: &str) -> Result<&'a ConfigSection> {
        match self.entries.get(self.pos) {
            Some((k, ConfigValue::Section(section))) if k.eq_ignore_ascii_case(key) => {
                self.pos += 1;
                Ok(section)
            }
            _ => Err(self.expected(key)),
        }
    }

    /// Fail unless the section is exhausted
    pub fn finish(&self) -> Result<()> {
        match self.peek_key() {
            None => Ok(()),
            Some(key) => Err(TrustError::config(format!(
                "Expecting the end of <{}>, found <{}.{key}>",
                self.context, self.context
            ))),
        }
    }

    fn expected(&self, key: &str) -> TrustError {
        TrustError::config(format!("Expecting <{}.{key}>", self.context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ConfigSection {
        ConfigSection::new()
            .leaf("type", "name")
            .leaf("name", "/a")
            .leaf("relation", "equal")
    }

    #[test]
    fn test_cursor_walks_in_order() {
        let section = filter();
        let mut cursor = section.cursor("filter");
        assert_eq!(cursor.leaf("TYPE").unwrap(), "name");
        assert!(cursor.next_is("name"));
        assert_eq!(cursor.optional_leaf("regex"), None);
        assert_eq!(cursor.leaf("name").unwrap(), "/a");
        assert_eq!(cursor.leaf("relation").unwrap(), "equal");
        assert!(cursor.is_done());
        cursor.finish().unwrap();
    }

    #[test]
    fn test_cursor_reports_expected_key() {
        let section = filter();
        let mut cursor = section.cursor("filter");
        let err = cursor.leaf("regex").unwrap_err();
        assert_eq!(err.to_string(), "Config error: Expecting <filter.regex>");
        assert!(cursor.section("type").is_err());
    }

    #[test]
    fn test_trailing_entries_rejected() {
        let section = filter().leaf("extra", "x");
        let mut cursor = section.cursor("filter");
        cursor.leaf("type").unwrap();
        cursor.leaf("name").unwrap();
        cursor.leaf("relation").unwrap();
        assert!(cursor.finish().is_err());
    }

    #[test]
    fn test_serde_shape() {
        let section = ConfigSection::new()
            .leaf("id", "r1")
            .section("filter", ConfigSection::new().leaf("type", "name"));
        let json = serde_json::to_string(&section).unwrap();
        assert_eq!(json, r#"[["id","r1"],["filter",[["type","name"]]]]"#);
        let back: ConfigSection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, section);
    }
}
