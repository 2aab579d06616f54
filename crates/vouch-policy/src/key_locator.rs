//! Signer key-locator rules
//!
//! These relate a packet to the key that signed it. `Relation` and `Regex`
//! look at the signer name alone; `Hyper` captures parts of both names,
//! expands them and compares the expansions, which is how hierarchical trust
//! ("a key may sign anything under its own identity") is expressed.
//!
//! Every failure path here resolves to `false`.

use crate::config::ConfigSection;
use crate::filter::{NamePattern, RelationKind};
use vouch_core::{ExpandTemplate, KeyLocator, Name, NameRegex, Result, TrustError};

/// Pattern plus the template applied to its captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturePattern {
    regex: NameRegex,
    expand: ExpandTemplate,
}

impl CapturePattern {
    /// Compile a pattern and its expansion template
    pub fn new(regex: &str, expand: &str) -> Result<Self> {
        Ok(Self {
            regex: NameRegex::new(regex)?,
            expand: ExpandTemplate::parse(expand)?,
        })
    }

    /// Match and expand; `None` on no match or a failed expansion
    pub fn derive(&self, name: &Name) -> Option<Name> {
        self.regex
            .captures(name)
            .and_then(|m| m.expand(&self.expand).ok())
    }
}

/// Relation between a packet name and its signer's key name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLocatorRule {
    /// `configured REL signer`
    Relation {
        /// Configured name
        name: Name,
        /// Relation with the configured name on the left
        relation: RelationKind,
    },
    /// Signer name must match the regex
    Regex(NameRegex),
    /// `expand(key) REL expand(packet)`
    Hyper {
        /// Applied to the packet name
        packet: CapturePattern,
        /// Applied to the signer name
        key: CapturePattern,
        /// Relation with the key expansion on the left
        relation: RelationKind,
    },
}

impl KeyLocatorRule {
    /// Check `locator` against `packet_name`
    pub fn check(&self, packet_name: &Name, locator: &KeyLocator) -> bool {
        let Some(signer) = locator.name() else {
            tracing::trace!(%packet_name, "key locator is not a name");
            return false;
        };
        self.check_signer(packet_name, signer)
    }

    /// Check a signer name against `packet_name`
    pub fn check_signer(&self, packet_name: &Name, signer: &Name) -> bool {
        match self {
            Self::Relation { name, relation } => {
                NamePattern::relation(name.clone(), *relation).matches(signer)
            }
            Self::Regex(regex) => regex.is_match(signer),
            Self::Hyper {
                packet,
                key,
                relation,
            } => {
                let Some(packet_derived) = packet.derive(packet_name) else {
                    tracing::trace!(%packet_name, "packet name does not match hyper pattern");
                    return false;
                };
                let Some(key_derived) = key.derive(signer) else {
                    tracing::trace!(%signer, "key name does not match hyper pattern");
                    return false;
                };
                let holds = relation.holds(&key_derived, &packet_derived);
                tracing::trace!(
                    key = %key_derived,
                    packet = %packet_derived,
                    %relation,
                    holds,
                    "hyper relation evaluated"
                );
                holds
            }
        }
    }

    /// Build from a `key-locator` section:
    ///
    /// ```text
    /// key-locator { type name; name /a/KEY/1; relation equal }
    /// key-locator { type name; regex ^<a><KEY><>$ }
    /// key-locator {
    ///   type name
    ///   hyper-relation { k-regex ..; k-expand ..; h-relation ..; p-regex ..; p-expand .. }
    /// }
    /// ```
    pub fn from_config(section: &ConfigSection) -> Result<Self> {
        let mut cursor = section.cursor("key-locator");
        let kind = cursor.leaf("type")?;
        if !kind.eq_ignore_ascii_case("name") {
            return Err(TrustError::config(format!(
                "Unsupported key-locator.type: {kind}"
            )));
        }

        let rule = if cursor.next_is("name") {
            let name = Name::parse(cursor.leaf("name")?)?;
            let relation = RelationKind::parse(cursor.leaf("relation")?)?;
            Self::Relation { name, relation }
        } else if cursor.next_is("regex") {
            Self::Regex(NameRegex::new(cursor.leaf("regex")?)?)
        } else if cursor.next_is("hyper-relation") {
            Self::hyper_from_config(cursor.section("hyper-relation")?)?
        } else {
            return Err(TrustError::config(
                "Expecting <key-locator.name>, <key-locator.regex> or <key-locator.hyper-relation>",
            ));
        };

        cursor.finish()?;
        Ok(rule)
    }

    fn hyper_from_config(section: &ConfigSection) -> Result<Self> {
        let mut cursor = section.cursor("hyper-relation");
        let k_regex = cursor.leaf("k-regex")?;
        let k_expand = cursor.leaf("k-expand")?;
        let relation = RelationKind::parse(cursor.leaf("h-relation")?)?;
        let p_regex = cursor.leaf("p-regex")?;
        let p_expand = cursor.leaf("p-expand")?;
        cursor.finish()?;

        Ok(Self::Hyper {
            packet: CapturePattern::new(p_regex, p_expand)?,
            key: CapturePattern::new(k_regex, k_expand)?,
            relation,
        })
    }
}
