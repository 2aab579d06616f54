//! Collaborator seams
//!
//! The trust engine never encodes packets, performs public-key cryptography or
//! reads clocks directly. Those capabilities arrive through the traits here so
//! that hosts plug in their own codec, crypto library and time source, and
//! tests can drive time by hand.
//!
//! - [`PacketCodec`]: signature-info and certificate encoding
//! - [`SignatureVerifier`]: `verify(payload, signature, public_key) -> bool`
//! - [`TimeSource`]: wall clock for request timestamps, monotonic clock for
//!   cache refresh bookkeeping

use crate::certificate::Certificate;
use crate::errors::Result;
use crate::packet::{Data, SignatureInfo};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Encoding of signature metadata and certificates
pub trait PacketCodec: Send + Sync {
    /// Decode signature metadata carried in a name component
    fn decode_signature_info(&self, bytes: &[u8]) -> Result<SignatureInfo>;

    /// Encode signature metadata for a name component
    fn encode_signature_info(&self, info: &SignatureInfo) -> Vec<u8>;

    /// Decode a certificate
    fn decode_certificate(&self, bytes: &[u8]) -> Result<Certificate>;

    /// Encode a certificate
    fn encode_certificate(&self, certificate: &Certificate) -> Vec<u8>;
}

/// JSON codec used when the host does not bring its own wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl PacketCodec for JsonCodec {
    fn decode_signature_info(&self, bytes: &[u8]) -> Result<SignatureInfo> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode_signature_info(&self, info: &SignatureInfo) -> Vec<u8> {
        // Serializing plain enums and byte vectors cannot fail.
        serde_json::to_vec(info).unwrap_or_default()
    }

    fn decode_certificate(&self, bytes: &[u8]) -> Result<Certificate> {
        let data: Data = serde_json::from_slice(bytes)?;
        Certificate::from_data(data)
    }

    fn encode_certificate(&self, certificate: &Certificate) -> Vec<u8> {
        serde_json::to_vec(certificate.data()).unwrap_or_default()
    }
}

/// Public-key signature verification
pub trait SignatureVerifier: Send + Sync {
    /// Whether `signature` over `payload` verifies under `public_key`
    fn verify(&self, payload: &[u8], signature: &[u8], public_key: &[u8]) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8], &[u8], &[u8]) -> bool + Send + Sync,
{
    fn verify(&self, payload: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        self(payload, signature, public_key)
    }
}

/// Check a digest-only signature
pub fn verify_digest_sha256(payload: &[u8], signature: &[u8]) -> bool {
    Sha256::digest(payload).as_slice() == signature
}

/// Compute a digest-only signature
pub fn digest_sha256(payload: &[u8]) -> Vec<u8> {
    Sha256::digest(payload).to_vec()
}

/// Clock access
pub trait TimeSource: Send + Sync {
    /// Wall-clock milliseconds since the Unix epoch
    fn wall_clock_ms(&self) -> u64;

    /// Monotonic time since an arbitrary fixed origin
    fn monotonic(&self) -> Duration;
}

/// Process clocks
#[derive(Debug, Clone)]
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    /// Create a time source anchored at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn wall_clock_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Hand-driven clock for simulation and tests
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    wall_ms: AtomicU64,
    monotonic_ns: AtomicU64,
}

impl ManualTimeSource {
    /// Start at the given wall-clock time with monotonic time zero
    pub fn new(wall_ms: u64) -> Self {
        Self {
            wall_ms: AtomicU64::new(wall_ms),
            monotonic_ns: AtomicU64::new(0),
        }
    }

    /// Move both clocks forward
    pub fn advance(&self, by: Duration) {
        let nanos = by.as_nanos().min(u128::from(u64::MAX)) as u64;
        self.monotonic_ns.fetch_add(nanos, Ordering::SeqCst);
        self.wall_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Set the wall clock without touching monotonic time
    pub fn set_wall_clock_ms(&self, wall_ms: u64) {
        self.wall_ms.store(wall_ms, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn wall_clock_ms(&self) -> u64 {
        self.wall_ms.load(Ordering::SeqCst)
    }

    fn monotonic(&self) -> Duration {
        Duration::from_nanos(self.monotonic_ns.load(Ordering::SeqCst))
    }
}
