//! Certificate retrieval
//!
//! Fetching is the only step of validation that may suspend. The driver
//! turns every fetch failure, timeouts included, into an ordinary
//! `CannotRetrieveCertificate` outcome.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use vouch_core::{Certificate, Name};

/// Certificate fetch failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Nothing known under the requested name
    #[error("certificate `{name}` not found")]
    NotFound {
        /// Requested name
        name: Name,
    },
    /// The fetcher has no way to reach the network
    #[error("offline: cannot fetch `{name}`")]
    Offline {
        /// Requested name
        name: Name,
    },
    /// The transport gave up waiting
    #[error("timed out fetching `{name}`")]
    Timeout {
        /// Requested name
        name: Name,
    },
    /// Any other transport failure
    #[error("transport error: {message}")]
    Transport {
        /// Failure description
        message: String,
    },
}

/// Source of certificates for chain walking
#[async_trait]
pub trait CertificateFetcher: Send + Sync {
    /// Fetch the certificate named (or prefixed) by `name`
    async fn fetch(&self, name: &Name) -> Result<Certificate, FetchError>;
}

/// Fetcher that never reaches out; every request fails
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

#[async_trait]
impl CertificateFetcher for OfflineFetcher {
    async fn fetch(&self, name: &Name) -> Result<Certificate, FetchError> {
        Err(FetchError::Offline { name: name.clone() })
    }
}

/// In-memory certificate store
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    certificates: RwLock<BTreeMap<Name, Certificate>>,
}

impl MemoryFetcher {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a certificate under its full name
    pub fn insert(&self, certificate: Certificate) {
        self.certificates
            .write()
            .insert(certificate.name().clone(), certificate);
    }

    /// Number of stored certificates
    pub fn len(&self) -> usize {
        self.certificates.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.certificates.read().is_empty()
    }
}

#[async_trait]
impl CertificateFetcher for MemoryFetcher {
    async fn fetch(&self, name: &Name) -> Result<Certificate, FetchError> {
        let certificates = self.certificates.read();
        // Names sort after their prefixes, so the first candidate at or
        // after `name` is the closest match when `name` is a key name.
        certificates
            .range(name.clone()..)
            .next()
            .filter(|(candidate, _)| name.is_prefix_of(candidate))
            .map(|(_, certificate)| certificate.clone())
            .ok_or_else(|| FetchError::NotFound { name: name.clone() })
    }
}
