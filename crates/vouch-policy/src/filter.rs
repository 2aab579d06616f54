//! Packet-selection filters
//!
//! A filter decides whether a rule applies to a packet by looking only at the
//! packet name. Signed requests are matched on the name left after stripping
//! the trailing signature components.

use crate::config::ConfigSection;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use vouch_core::{Name, NameRegex, Packet, Result, TrustError};

/// Relation between two names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    /// Component-wise equality
    Equal,
    /// Left is a prefix of (or equal to) right
    IsPrefixOf,
    /// Left is a prefix of right and right is strictly longer
    IsStrictPrefixOf,
}

impl RelationKind {
    /// Parse the schema spelling, case-insensitively
    pub fn parse(text: &str) -> Result<Self> {
        match text.to_ascii_lowercase().as_str() {
            "equal" => Ok(Self::Equal),
            "is-prefix-of" => Ok(Self::IsPrefixOf),
            "is-strict-prefix-of" => Ok(Self::IsStrictPrefixOf),
            _ => Err(TrustError::config(format!("Unsupported relation: {text}"))),
        }
    }

    /// Evaluate `left REL right`
    pub fn holds(&self, left: &Name, right: &Name) -> bool {
        match self {
            Self::Equal => left == right,
            Self::IsPrefixOf => left.is_prefix_of(right),
            Self::IsStrictPrefixOf => left.is_strict_prefix_of(right),
        }
    }

    /// Schema spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "equal",
            Self::IsPrefixOf => "is-prefix-of",
            Self::IsStrictPrefixOf => "is-strict-prefix-of",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name used for rule selection: the full data name, or the signed request
/// name without its four signature components. Requests too short to carry
/// those components have no matching name.
pub fn matching_name<'a>(packet: Packet<'a>) -> Option<Cow<'a, Name>> {
    match packet {
        Packet::Data(data) => Some(Cow::Borrowed(&data.name)),
        Packet::Interest(interest) => interest.unsigned_name().map(Cow::Owned),
    }
}

/// Name predicate: a fixed name under a relation, or a name regex
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    /// `configured REL candidate`
    Relation {
        /// Configured name
        name: Name,
        /// Relation applied with the configured name on the left
        relation: RelationKind,
    },
    /// Full-name regex match
    Regex(NameRegex),
}

impl NamePattern {
    /// Relation pattern
    pub fn relation(name: Name, relation: RelationKind) -> Self {
        Self::Relation { name, relation }
    }

    /// Regex pattern
    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(Self::Regex(NameRegex::new(pattern)?))
    }

    /// Whether `name` satisfies the pattern
    pub fn matches(&self, name: &Name) -> bool {
        let matched = match self {
            Self::Relation { name: configured, relation } => relation.holds(configured, name),
            Self::Regex(regex) => regex.is_match(name),
        };
        tracing::trace!(pattern = ?self, %name, matched, "name pattern evaluated");
        matched
    }
}

/// Rule-selection filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pattern: NamePattern,
}

impl Filter {
    /// Filter over a name pattern
    pub fn new(pattern: NamePattern) -> Self {
        Self { pattern }
    }

    /// The underlying pattern
    pub fn pattern(&self) -> &NamePattern {
        &self.pattern
    }

    /// Whether the filter selects `packet`
    pub fn matches(&self, packet: Packet<'_>) -> bool {
        matching_name(packet).is_some_and(|name| self.pattern.matches(&name))
    }

    /// Build from a `filter` section:
    ///
    /// ```text
    /// filter { type name; name /a/b; relation is-prefix-of }
    /// filter { type name; regex ^<a><>*$ }
    /// ```
    pub fn from_config(section: &ConfigSection) -> Result<Self> {
        let mut cursor = section.cursor("filter");
        let kind = cursor.leaf("type")?;
        if !kind.eq_ignore_ascii_case("name") {
            return Err(TrustError::config(format!("Unsupported filter.type: {kind}")));
        }

        let pattern = if cursor.next_is("name") {
            let name = Name::parse(cursor.leaf("name")?)?;
            let relation = RelationKind::parse(cursor.leaf("relation")?)?;
            NamePattern::relation(name, relation)
        } else if cursor.next_is("regex") {
            NamePattern::regex(cursor.leaf("regex")?)?
        } else {
            return Err(TrustError::config(
                "Expecting <filter.name> or <filter.regex>",
            ));
        };

        cursor.finish()?;
        Ok(Self::new(pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use vouch_core::{Component, Data, Interest};

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    #[test]
    fn test_relations() {
        let a = name("/a");
        let ab = name("/a/b");
        assert!(RelationKind::Equal.holds(&a, &a));
        assert!(!RelationKind::Equal.holds(&a, &ab));
        assert!(RelationKind::IsPrefixOf.holds(&a, &a));
        assert!(RelationKind::IsPrefixOf.holds(&a, &ab));
        assert!(!RelationKind::IsStrictPrefixOf.holds(&a, &a));
        assert!(RelationKind::IsStrictPrefixOf.holds(&a, &ab));
        assert!(!RelationKind::IsPrefixOf.holds(&ab, &a));
    }

    #[test]
    fn test_relation_spelling() {
        assert_eq!(RelationKind::parse("IS-PREFIX-OF").unwrap(), RelationKind::IsPrefixOf);
        assert!(RelationKind::parse("prefix").is_err());
    }

    #[test]
    fn test_request_filter_strips_signature_components() {
        let filter = Filter::new(NamePattern::relation(name("/cmd"), RelationKind::Equal));
        let request = Interest::new(name("/cmd/1/2/3/4"));
        assert!(filter.matches(Packet::Interest(&request)));

        let short = Interest::new(name("/cmd/1/2"));
        assert!(!filter.matches(Packet::Interest(&short)));

        let data = Data::new(name("/cmd/1/2/3/4"), vec![]);
        assert!(!filter.matches(Packet::Data(&data)));
    }

    #[test]
    fn test_filter_from_config() {
        let relation = ConfigSection::new()
            .leaf("type", "name")
            .leaf("name", "/a")
            .leaf("relation", "is-strict-prefix-of");
        let filter = Filter::from_config(&relation).unwrap();
        let data = Data::new(name("/a/b"), vec![]);
        assert!(filter.matches(Packet::Data(&data)));

        let regex = ConfigSection::new()
            .leaf("type", "name")
            .leaf("regex", "^<a><>$");
        assert!(Filter::from_config(&regex)
            .unwrap()
            .matches(Packet::Data(&data)));
    }

    #[test]
    fn test_filter_config_errors() {
        let wrong_type = ConfigSection::new().leaf("type", "regex");
        assert!(Filter::from_config(&wrong_type).is_err());

        let missing_relation = ConfigSection::new().leaf("type", "name").leaf("name", "/a");
        assert!(Filter::from_config(&missing_relation).is_err());

        let neither = ConfigSection::new().leaf("type", "name").leaf("foo", "bar");
        assert!(Filter::from_config(&neither).is_err());

        let trailing = ConfigSection::new()
            .leaf("type", "name")
            .leaf("regex", "^<a>$")
            .leaf("name", "/a");
        assert!(Filter::from_config(&trailing).is_err());
    }

    fn arb_name() -> impl Strategy<Value = Name> {
        prop::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..5)
            .prop_map(|parts| Name::from_components(parts.into_iter().map(Component::from)))
    }

    proptest! {
        #[test]
        fn prefix_relation_is_componentwise(pattern in arb_name(), candidate in arb_name()) {
            let componentwise = pattern.len() <= candidate.len()
                && pattern.iter().zip(candidate.iter()).all(|(p, c)| p == c);
            let prefix = NamePattern::relation(pattern.clone(), RelationKind::IsPrefixOf);
            prop_assert_eq!(prefix.matches(&candidate), componentwise);

            let strict = NamePattern::relation(pattern.clone(), RelationKind::IsStrictPrefixOf);
            prop_assert_eq!(
                strict.matches(&candidate),
                componentwise && pattern.len() < candidate.len()
            );
        }
    }
}
