//! Name components
//!
//! A component is an opaque byte string. Its textual form is the URI
//! escaping used by the name regex engine: unreserved ASCII passes through,
//! everything else is `%XX`, and a component made only of periods gets three
//! extra periods so that `.`, `..` and the empty component stay representable.

use crate::errors::{Result, TrustError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One opaque component of a [`Name`](super::Name)
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Component(Vec<u8>);

impl Component {
    /// Create a component from raw bytes
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Encode `value` as a non-negative integer component (1, 2, 4 or 8
    /// big-endian bytes, shortest that fits)
    pub fn from_number(value: u64) -> Self {
        let bytes = if value <= u64::from(u8::MAX) {
            vec![value as u8]
        } else if value <= u64::from(u16::MAX) {
            (value as u16).to_be_bytes().to_vec()
        } else if value <= u64::from(u32::MAX) {
            (value as u32).to_be_bytes().to_vec()
        } else {
            value.to_be_bytes().to_vec()
        };
        Self(bytes)
    }

    /// Parse a single URI-escaped component
    pub fn from_uri(text: &str) -> Result<Self> {
        if !text.is_empty() && text.bytes().all(|b| b == b'.') {
            if text.len() < 3 {
                return Err(TrustError::invalid_name(format!(
                    "component `{text}` is reserved"
                )));
            }
            return unescape(&text[3..]).map(Self);
        }
        unescape(text).map(Self)
    }

    /// Raw component bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the component holds a non-negative integer encoding
    pub fn is_number(&self) -> bool {
        matches!(self.0.len(), 1 | 2 | 4 | 8)
    }

    /// Decode the component as a non-negative integer
    pub fn to_number(&self) -> Option<u64> {
        if !self.is_number() {
            return None;
        }
        Some(self.0.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
    }

    /// URI-escaped textual form
    pub fn to_uri(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        if self.0.iter().all(|b| *b == b'.') {
            out.push_str("...");
        }
        for byte in &self.0 {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                out.push(*byte as char);
            } else {
                out.push('%');
                out.push_str(&hex::encode_upper([*byte]));
            }
        }
        out
    }
}

fn unescape(text: &str) -> Result<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let digits = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| TrustError::invalid_name(format!("truncated escape in `{text}`")))?;
            let decoded = hex::decode(digits)
                .map_err(|_| TrustError::invalid_name(format!("bad escape in `{text}`")))?;
            out.extend_from_slice(&decoded);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

impl From<&str> for Component {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.to_uri())
    }
}
