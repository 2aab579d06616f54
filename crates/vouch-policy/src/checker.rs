//! Acceptance checkers
//!
//! A checker validates the declared signature type of a packet and, for
//! public-key signatures, the relation between the packet and its signer.

use crate::config::ConfigSection;
use crate::filter::{matching_name, RelationKind};
use crate::key_locator::{CapturePattern, KeyLocatorRule};
use std::fmt;
use std::sync::Arc;
use vouch_core::{
    Packet, PacketCodec, Result, SignatureInfo, SignatureKind, SignatureType, TrustError,
};

/// Host-supplied acceptance predicate
pub trait PacketChecker: Send + Sync {
    /// Whether `packet` is acceptable
    fn check(&self, packet: Packet<'_>, codec: &dyn PacketCodec) -> bool;
}

/// Acceptance predicate used by rules
#[derive(Clone)]
pub enum Checker {
    /// Signature type plus an optional key-locator rule
    Signature {
        /// Required signature type
        expected: SignatureType,
        /// Signer relation; present for every asymmetric checker
        key_locator: Option<KeyLocatorRule>,
    },
    /// Capability object supplied by the host
    External(Arc<dyn PacketChecker>),
}

impl Checker {
    /// Checker for `expected`; asymmetric types require a key-locator rule
    pub fn new(expected: SignatureType, key_locator: Option<KeyLocatorRule>) -> Result<Self> {
        if expected.kind() == SignatureKind::AsymmetricWithKeyLocator && key_locator.is_none() {
            return Err(TrustError::config(format!(
                "{expected} checker requires a key-locator rule"
            )));
        }
        Ok(Self::Signature {
            expected,
            key_locator,
        })
    }

    /// Preset accepting signers whose identity is a prefix of the packet name.
    ///
    /// The signer may be named by its key (`/<id>/KEY/<kid>`) or its
    /// certificate (`/<id>/KEY/<kid>/<issuer>/<version>`).
    pub fn hierarchical(expected: SignatureType) -> Result<Self> {
        let rule = KeyLocatorRule::Hyper {
            packet: CapturePattern::new("^(<>*)$", "\\1")?,
            key: CapturePattern::new("^(<>*)<KEY><>{1,3}$", "\\1")?,
            relation: RelationKind::IsPrefixOf,
        };
        Self::new(expected, Some(rule))
    }

    /// Wrap a host-supplied predicate
    pub fn external(checker: impl PacketChecker + 'static) -> Self {
        Self::External(Arc::new(checker))
    }

    /// Whether `packet` is acceptable
    pub fn check(&self, packet: Packet<'_>, codec: &dyn PacketCodec) -> bool {
        match self {
            Self::Signature {
                expected,
                key_locator,
            } => check_signature(*expected, key_locator.as_ref(), packet, codec),
            Self::External(checker) => checker.check(packet, codec),
        }
    }

    /// Build from a `checker` section:
    ///
    /// ```text
    /// checker { type customized; sig-type rsa-sha256; key-locator { .. } }
    /// checker { type hierarchical; sig-type ecdsa-sha256 }
    /// ```
    pub fn from_config(section: &ConfigSection) -> Result<Self> {
        let mut cursor = section.cursor("checker");
        let kind = cursor.leaf("type")?;

        let checker = if kind.eq_ignore_ascii_case("customized") {
            let expected = parse_signature_type(cursor.leaf("sig-type")?)?;
            let key_locator = KeyLocatorRule::from_config(cursor.section("key-locator")?)?;
            Self::new(expected, Some(key_locator))?
        } else if kind.eq_ignore_ascii_case("hierarchical") {
            Self::hierarchical(parse_signature_type(cursor.leaf("sig-type")?)?)?
        } else {
            return Err(TrustError::config(format!("Unsupported checker.type: {kind}")));
        };

        cursor.finish()?;
        Ok(checker)
    }
}

impl fmt::Debug for Checker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature {
                expected,
                key_locator,
            } => f
                .debug_struct("Signature")
                .field("expected", expected)
                .field("key_locator", key_locator)
                .finish(),
            Self::External(_) => f.write_str("External(..)"),
        }
    }
}

/// Parse a schema `sig-type` value
pub fn parse_signature_type(text: &str) -> Result<SignatureType> {
    match text.to_ascii_lowercase().as_str() {
        "rsa-sha256" => Ok(SignatureType::Sha256WithRsa),
        "ecdsa-sha256" => Ok(SignatureType::Sha256WithEcdsa),
        "sha256" => Ok(SignatureType::DigestSha256),
        _ => Err(TrustError::config(format!("Unsupported checker.sig-type: {text}"))),
    }
}

fn signature_info(packet: Packet<'_>, codec: &dyn PacketCodec) -> Option<SignatureInfo> {
    match packet {
        Packet::Data(data) => data.signature_info.clone(),
        Packet::Interest(interest) => match interest.signature_info(codec) {
            Ok(info) => Some(info),
            Err(err) => {
                tracing::debug!(name = %interest.name, error = %err, "undecodable signature info");
                None
            }
        },
    }
}

fn check_signature(
    expected: SignatureType,
    key_locator: Option<&KeyLocatorRule>,
    packet: Packet<'_>,
    codec: &dyn PacketCodec,
) -> bool {
    let Some(info) = signature_info(packet, codec) else {
        return false;
    };
    if info.signature_type != expected {
        tracing::trace!(
            name = %packet.name(),
            declared = %info.signature_type,
            %expected,
            "signature type mismatch"
        );
        return false;
    }
    if expected.kind() == SignatureKind::DigestOnly {
        return true;
    }

    let (Some(rule), Some(locator)) = (key_locator, info.key_locator.as_ref()) else {
        return false;
    };
    let Some(name) = matching_name(packet) else {
        return false;
    };
    rule.check(&name, locator)
}
