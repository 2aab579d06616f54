//! Key and certificate naming conventions
//!
//! ```text
//! key name:          /<identity>/KEY/<key-id>
//! certificate name:  /<identity>/KEY/<key-id>/<issuer-id>/<version>
//! ```

use crate::errors::{Result, TrustError};
use crate::name::{Component, Name};

/// The `KEY` marker component
pub const KEY_COMPONENT: &str = "KEY";

fn is_key_marker(component: Option<&Component>) -> bool {
    component.is_some_and(|c| c.as_bytes() == KEY_COMPONENT.as_bytes())
}

/// Whether `name` follows the key naming convention
pub fn is_key_name(name: &Name) -> bool {
    name.len() >= 2 && is_key_marker(name.get(-2))
}

/// Whether `name` follows the certificate naming convention
pub fn is_certificate_name(name: &Name) -> bool {
    name.len() >= 4 && is_key_marker(name.get(-4))
}

/// Identity portion of a key name
pub fn extract_identity_from_key_name(key_name: &Name) -> Result<Name> {
    if !is_key_name(key_name) {
        return Err(TrustError::invalid_name(format!(
            "key name `{key_name}` does not follow /<identity>/KEY/<key-id>"
        )));
    }
    Ok(key_name.prefix(-2))
}

/// Key name portion of a certificate name
pub fn certificate_name_to_key_name(cert_name: &Name) -> Result<Name> {
    if !is_certificate_name(cert_name) {
        return Err(TrustError::invalid_name(format!(
            "certificate name `{cert_name}` does not follow /<identity>/KEY/<key-id>/<issuer>/<version>"
        )));
    }
    Ok(cert_name.prefix(-2))
}

/// Normalize a key locator to a key name: certificate names are truncated,
/// key names pass through, anything else is rejected.
pub fn key_name_from_locator(locator: &Name) -> Result<Name> {
    if is_key_name(locator) {
        Ok(locator.clone())
    } else {
        certificate_name_to_key_name(locator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        Name::parse(uri).unwrap()
    }

    #[test]
    fn test_key_names() {
        assert!(is_key_name(&name("/a/b/KEY/1")));
        assert!(!is_key_name(&name("/a/b/1")));
        assert_eq!(
            extract_identity_from_key_name(&name("/a/b/KEY/1")).unwrap(),
            name("/a/b")
        );
        assert!(extract_identity_from_key_name(&name("/KEY")).is_err());
    }

    #[test]
    fn test_certificate_names() {
        let cert = name("/a/KEY/1/self/v1");
        assert!(is_certificate_name(&cert));
        assert_eq!(certificate_name_to_key_name(&cert).unwrap(), name("/a/KEY/1"));
        assert_eq!(key_name_from_locator(&cert).unwrap(), name("/a/KEY/1"));
        assert_eq!(
            key_name_from_locator(&name("/a/KEY/1")).unwrap(),
            name("/a/KEY/1")
        );
        assert!(key_name_from_locator(&name("/a/b")).is_err());
    }
}
