//! Trust schema rules

use crate::checker::Checker;
use crate::config::ConfigSection;
use crate::filter::Filter;
use serde::{Deserialize, Serialize};
use std::fmt;
use vouch_core::{Packet, PacketCodec, Result, TrustError};

/// Packet kind a rule applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleTarget {
    /// Data objects
    Data,
    /// Signed requests
    Interest,
}

impl RuleTarget {
    /// Parse the schema `for` value
    pub fn parse(text: &str) -> Result<Self> {
        if text.eq_ignore_ascii_case("data") {
            Ok(Self::Data)
        } else if text.eq_ignore_ascii_case("interest") {
            Ok(Self::Interest)
        } else {
            Err(TrustError::config(format!("Unrecognized rule.for: {text}")))
        }
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => f.write_str("data"),
            Self::Interest => f.write_str("interest"),
        }
    }
}

/// Named bundle of selection filters and acceptance checkers.
///
/// Invariant: at least one checker.
#[derive(Debug, Clone)]
pub struct Rule {
    id: String,
    filters: Vec<Filter>,
    checkers: Vec<Checker>,
}

impl Rule {
    /// Create a rule; fails if `checkers` is empty
    pub fn new(id: impl Into<String>, filters: Vec<Filter>, checkers: Vec<Checker>) -> Result<Self> {
        let id = id.into();
        if checkers.is_empty() {
            return Err(TrustError::config(format!(
                "No <rule.checker> is specified in rule: {id}"
            )));
        }
        Ok(Self {
            id,
            filters,
            checkers,
        })
    }

    /// Rule identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Selection filters
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Acceptance checkers
    pub fn checkers(&self) -> &[Checker] {
        &self.checkers
    }

    /// True when there are no filters or every filter matches
    pub fn matches(&self, packet: Packet<'_>) -> bool {
        self.filters.iter().all(|filter| filter.matches(packet))
    }

    /// True when every checker passes; stops at the first rejection
    pub fn check(&self, packet: Packet<'_>, codec: &dyn PacketCodec) -> bool {
        let mut evaluated = false;
        for checker in &self.checkers {
            if !checker.check(packet, codec) {
                tracing::debug!(rule_id = %self.id, name = %packet.name(), "checker rejected");
                return false;
            }
            evaluated = true;
        }
        evaluated
    }

    /// Build from a `rule` section:
    ///
    /// ```text
    /// rule {
    ///   id "Simple rule"
    ///   for data
    ///   filter { .. }     ; zero or more
    ///   checker { .. }    ; one or more
    /// }
    /// ```
    pub fn from_config(section: &ConfigSection) -> Result<(RuleTarget, Self)> {
        let mut cursor = section.cursor("rule");
        let id = cursor.leaf("id")?;
        let target = RuleTarget::parse(cursor.leaf("for")?)?;

        let mut filters = Vec::new();
        while cursor.next_is("filter") {
            filters.push(Filter::from_config(cursor.section("filter")?)?);
        }

        let mut checkers = Vec::new();
        while cursor.next_is("checker") {
            checkers.push(Checker::from_config(cursor.section("checker")?)?);
        }

        if !cursor.is_done() && checkers.is_empty() {
            return Err(TrustError::config(format!(
                "Expecting <rule.checker> in rule: {id}"
            )));
        }
        cursor.finish()?;

        let rule = Self::new(id, filters, checkers)?;
        tracing::debug!(
            rule_id = %rule.id,
            %target,
            filters = rule.filters.len(),
            checkers = rule.checkers.len(),
            "rule loaded"
        );
        Ok((target, rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::PacketChecker;
    use crate::filter::{NamePattern, RelationKind};
    use vouch_core::{Data, JsonCodec, Name, SignatureInfo, SignatureType};

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    struct Fixed(bool);

    impl PacketChecker for Fixed {
        fn check(&self, _: Packet<'_>, _: &dyn PacketCodec) -> bool {
            self.0
        }
    }

    struct MustNotRun;

    impl PacketChecker for MustNotRun {
        fn check(&self, _: Packet<'_>, _: &dyn PacketCodec) -> bool {
            panic!("checker evaluated after an earlier rejection");
        }
    }

    fn prefix_filter(uri: &str) -> Filter {
        Filter::new(NamePattern::relation(name(uri), RelationKind::IsPrefixOf))
    }

    #[test]
    fn test_rule_requires_checker() {
        let err = Rule::new("empty", vec![], vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Config error: No <rule.checker> is specified in rule: empty"
        );
    }

    #[test]
    fn test_empty_filters_match_everything() {
        let rule = Rule::new("all", vec![], vec![Checker::external(Fixed(true))]).unwrap();
        let data = Data::new(name("/anything/at/all"), vec![]);
        assert!(rule.matches(Packet::Data(&data)));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let rule = Rule::new(
            "both",
            vec![prefix_filter("/a"), prefix_filter("/a/b")],
            vec![Checker::external(Fixed(true))],
        )
        .unwrap();
        assert!(rule.matches(Packet::Data(&Data::new(name("/a/b/c"), vec![]))));
        assert!(!rule.matches(Packet::Data(&Data::new(name("/a/c"), vec![]))));
    }

    #[test]
    fn test_check_is_fail_fast() {
        let rule = Rule::new(
            "fail-fast",
            vec![],
            vec![Checker::external(Fixed(false)), Checker::external(MustNotRun)],
        )
        .unwrap();
        let data = Data::new(name("/a"), vec![]);
        assert!(!rule.check(Packet::Data(&data), &JsonCodec));
    }

    #[test]
    fn test_check_requires_every_checker() {
        let rule = Rule::new(
            "and",
            vec![],
            vec![Checker::external(Fixed(true)), Checker::external(Fixed(false))],
        )
        .unwrap();
        let data = Data::new(name("/a"), vec![]);
        assert!(!rule.check(Packet::Data(&data), &JsonCodec));
    }

    fn hierarchical_checker() -> ConfigSection {
        ConfigSection::new()
            .leaf("type", "hierarchical")
            .leaf("sig-type", "rsa-sha256")
    }

    #[test]
    fn test_from_config() {
        let section = ConfigSection::new()
            .leaf("id", "r1")
            .leaf("for", "data")
            .section(
                "filter",
                ConfigSection::new()
                    .leaf("type", "name")
                    .leaf("name", "/a")
                    .leaf("relation", "is-prefix-of"),
            )
            .section("checker", hierarchical_checker());
        let (target, rule) = Rule::from_config(&section).unwrap();
        assert_eq!(target, RuleTarget::Data);
        assert_eq!(rule.id(), "r1");
        assert_eq!(rule.filters().len(), 1);

        let data = Data::new(name("/a/b"), vec![]).with_signature(
            SignatureInfo::with_key_name(SignatureType::Sha256WithRsa, name("/a/KEY/1")),
            vec![1],
        );
        assert!(rule.matches(Packet::Data(&data)));
        assert!(rule.check(Packet::Data(&data), &JsonCodec));
    }

    #[test]
    fn test_from_config_errors() {
        let no_checker = ConfigSection::new().leaf("id", "r").leaf("for", "data");
        assert_eq!(
            Rule::from_config(&no_checker).unwrap_err().to_string(),
            "Config error: No <rule.checker> is specified in rule: r"
        );

        let bad_target = ConfigSection::new()
            .leaf("id", "r")
            .leaf("for", "certificate")
            .section("checker", hierarchical_checker());
        assert!(Rule::from_config(&bad_target).is_err());

        let filter_after_checker = ConfigSection::new()
            .leaf("id", "r")
            .leaf("for", "data")
            .section("checker", hierarchical_checker())
            .section("filter", ConfigSection::new().leaf("type", "name").leaf("regex", "^<>$"));
        assert!(Rule::from_config(&filter_after_checker).is_err());

        let missing_id = ConfigSection::new()
            .leaf("for", "data")
            .section("checker", hierarchical_checker());
        assert!(Rule::from_config(&missing_id).is_err());
    }
}
