//! Packet model
//!
//! Structured views of the two signed packet kinds. Wire encoding is owned by
//! a [`PacketCodec`](crate::effects::PacketCodec); this module only fixes the
//! shapes the policies reason about and the layout of signed request names.

use crate::effects::PacketCodec;
use crate::errors::{Result, TrustError};
use crate::name::{Component, Name};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Layout of the trailing components of a signed request name
///
/// ```text
/// /<command...>/<timestamp>/<nonce>/<signature-info>/<signature-value>
/// ```
pub mod signed_interest {
    /// Minimum number of components in a signed request name
    pub const MIN_SIZE: usize = 4;
    /// Millisecond timestamp (non-negative integer component)
    pub const POS_TIMESTAMP: isize = -4;
    /// Random nonce
    pub const POS_NONCE: isize = -3;
    /// Encoded signature info
    pub const POS_SIG_INFO: isize = -2;
    /// Signature bits
    pub const POS_SIG_VALUE: isize = -1;
}

/// Declared signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    /// Plain SHA-256 digest, no signer
    DigestSha256,
    /// RSA over SHA-256
    Sha256WithRsa,
    /// ECDSA over SHA-256
    Sha256WithEcdsa,
}

impl SignatureType {
    /// Whether the type is digest-only or requires a signer key locator
    pub fn kind(&self) -> SignatureKind {
        match self {
            SignatureType::DigestSha256 => SignatureKind::DigestOnly,
            SignatureType::Sha256WithRsa | SignatureType::Sha256WithEcdsa => {
                SignatureKind::AsymmetricWithKeyLocator
            }
        }
    }

    /// Name used in trust schema configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureType::DigestSha256 => "sha256",
            SignatureType::Sha256WithRsa => "rsa-sha256",
            SignatureType::Sha256WithEcdsa => "ecdsa-sha256",
        }
    }
}

impl fmt::Display for SignatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse signature classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureKind {
    /// Integrity only; no signer to chase
    DigestOnly,
    /// Public-key signature naming its signer through a key locator
    AsymmetricWithKeyLocator,
}

/// Identifies the key that produced a signature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyLocator {
    /// Name of the signer's key or certificate
    Name(Name),
    /// Digest of the signer's public key
    KeyDigest(Vec<u8>),
}

impl KeyLocator {
    /// The locator name, if this is a name-type locator
    pub fn name(&self) -> Option<&Name> {
        match self {
            KeyLocator::Name(name) => Some(name),
            KeyLocator::KeyDigest(_) => None,
        }
    }
}

/// Signature metadata carried by a packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// Declared algorithm
    pub signature_type: SignatureType,
    /// Signer locator, if any
    pub key_locator: Option<KeyLocator>,
}

impl SignatureInfo {
    /// Metadata for a signature by the named key
    pub fn with_key_name(signature_type: SignatureType, key_name: Name) -> Self {
        Self {
            signature_type,
            key_locator: Some(KeyLocator::Name(key_name)),
        }
    }

    /// Metadata for a digest-only signature
    pub fn digest_sha256() -> Self {
        Self {
            signature_type: SignatureType::DigestSha256,
            key_locator: None,
        }
    }

    /// The key locator name, if present and name-typed
    pub fn key_locator_name(&self) -> Option<&Name> {
        self.key_locator.as_ref().and_then(KeyLocator::name)
    }
}

/// A named, signed data object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// Data name
    pub name: Name,
    /// Payload bytes
    pub content: Vec<u8>,
    /// Signature metadata; `None` for unsigned data
    pub signature_info: Option<SignatureInfo>,
    /// Signature bits
    pub signature_value: Vec<u8>,
}

impl Data {
    /// Unsigned data
    pub fn new(name: Name, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name,
            content: content.into(),
            signature_info: None,
            signature_value: Vec::new(),
        }
    }

    /// Attach signature metadata and bits
    pub fn with_signature(mut self, info: SignatureInfo, value: impl Into<Vec<u8>>) -> Self {
        self.signature_info = Some(info);
        self.signature_value = value.into();
        self
    }

    /// Bytes covered by the signature: length-prefixed name components,
    /// content, then the encoded signature info.
    pub fn signed_portion(&self, codec: &dyn PacketCodec) -> Vec<u8> {
        let mut out = Vec::new();
        encode_name(&self.name, &mut out);
        out.extend_from_slice(&(self.content.len() as u64).to_be_bytes());
        out.extend_from_slice(&self.content);
        if let Some(info) = &self.signature_info {
            out.extend_from_slice(&codec.encode_signature_info(info));
        }
        out
    }
}

/// A request packet; signed requests carry their signature in the name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interest {
    /// Request name, including signature components when signed
    pub name: Name,
}

impl Interest {
    /// Wrap a request name
    pub fn new(name: Name) -> Self {
        Self { name }
    }

    /// Build a signed request name from its parts
    pub fn signed(
        command: &Name,
        timestamp_ms: u64,
        nonce: u64,
        info: &SignatureInfo,
        signature_value: impl Into<Vec<u8>>,
        codec: &dyn PacketCodec,
    ) -> Self {
        let name = command
            .append(Component::from_number(timestamp_ms))
            .append(Component::from_number(nonce))
            .append(Component::new(codec.encode_signature_info(info)))
            .append(Component::new(signature_value.into()));
        Self { name }
    }

    /// Name with the signature components stripped, if long enough
    pub fn unsigned_name(&self) -> Option<Name> {
        (self.name.len() >= signed_interest::MIN_SIZE)
            .then(|| self.name.prefix(-(signed_interest::MIN_SIZE as isize)))
    }

    /// Raw timestamp component
    pub fn timestamp_component(&self) -> Option<&Component> {
        self.name.get(signed_interest::POS_TIMESTAMP)
    }

    /// Decode the embedded signature info
    pub fn signature_info(&self, codec: &dyn PacketCodec) -> Result<SignatureInfo> {
        let component = self
            .name
            .get(signed_interest::POS_SIG_INFO)
            .ok_or_else(|| TrustError::decode("request name has no signature info component"))?;
        codec.decode_signature_info(component.as_bytes())
    }

    /// Signature bits from the last component
    pub fn signature_value(&self) -> Option<&[u8]> {
        self.name
            .get(signed_interest::POS_SIG_VALUE)
            .map(Component::as_bytes)
    }

    /// Bytes covered by the signature: every component except the last
    pub fn signed_portion(&self) -> Vec<u8> {
        let mut out = Vec::new();
        encode_name(&self.name.prefix(-1), &mut out);
        out
    }
}

/// Borrowed view over either packet kind
#[derive(Debug, Clone, Copy)]
pub enum Packet<'a> {
    /// A data object
    Data(&'a Data),
    /// A (signed) request
    Interest(&'a Interest),
}

impl<'a> Packet<'a> {
    /// Full packet name
    pub fn name(&self) -> &'a Name {
        match self {
            Packet::Data(data) => &data.name,
            Packet::Interest(interest) => &interest.name,
        }
    }
}

impl<'a> From<&'a Data> for Packet<'a> {
    fn from(value: &'a Data) -> Self {
        Packet::Data(value)
    }
}

impl<'a> From<&'a Interest> for Packet<'a> {
    fn from(value: &'a Interest) -> Self {
        Packet::Interest(value)
    }
}

fn encode_name(name: &Name, out: &mut Vec<u8>) {
    out.extend_from_slice(&(name.len() as u32).to_be_bytes());
    for component in name {
        out.extend_from_slice(&(component.as_bytes().len() as u32).to_be_bytes());
        out.extend_from_slice(component.as_bytes());
    }
}
