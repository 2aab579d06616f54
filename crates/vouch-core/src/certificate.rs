//! Certificates
//!
//! A certificate is a data packet named by the certificate convention whose
//! content is the subject's public key.

use crate::effects::PacketCodec;
use crate::errors::{Result, TrustError};
use crate::name::Name;
use crate::naming;
use crate::packet::Data;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// A public-key certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    data: Data,
}

impl Certificate {
    /// Wrap a data packet, checking the certificate naming convention
    pub fn from_data(data: Data) -> Result<Self> {
        if !naming::is_certificate_name(&data.name) {
            return Err(TrustError::decode(format!(
                "`{}` is not a certificate name",
                data.name
            )));
        }
        Ok(Self { data })
    }

    /// Decode a base64 text blob (whitespace tolerated) through `codec`
    pub fn from_base64(text: &str, codec: &dyn PacketCodec) -> Result<Self> {
        let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(compact)?;
        codec.decode_certificate(&bytes)
    }

    /// Encode as base64 text through `codec`
    pub fn to_base64(&self, codec: &dyn PacketCodec) -> String {
        base64::engine::general_purpose::STANDARD.encode(codec.encode_certificate(self))
    }

    /// Full certificate name
    pub fn name(&self) -> &Name {
        &self.data.name
    }

    /// Name of the certified key
    pub fn key_name(&self) -> Name {
        self.data.name.prefix(-2)
    }

    /// Identity owning the key
    pub fn identity(&self) -> Name {
        self.data.name.prefix(-4)
    }

    /// Public key bits
    pub fn public_key(&self) -> &[u8] {
        &self.data.content
    }

    /// The underlying data packet
    pub fn data(&self) -> &Data {
        &self.data
    }

    /// Consume into the underlying data packet
    pub fn into_data(self) -> Data {
        self.data
    }
}
