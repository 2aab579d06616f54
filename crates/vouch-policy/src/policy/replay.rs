//! Anti-replay wrapper for signed requests
//!
//! ```text
//! check_interest(request)
//!   1. cleanup       expire by TTL, then trim to capacity
//!   2. structure     length, timestamp, signature info, key locator
//!   3. inner policy  anything but Accepted/RequestCertificate is final
//!   4. replay check  cleanup again, then grace window on first sighting and
//!                    strict increase after, under one lock
//! ```
//!
//! Data packets pass straight through to the inner policy.

use super::replay_cache::{ReplayCache, ReplayRejection};
use super::ValidationPolicy;
use crate::anchors::TrustAnchorSet;
use crate::outcome::{ValidationErrorKind, ValidationOutcome};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use vouch_core::naming::key_name_from_locator;
use vouch_core::{
    signed_interest, Data, Interest, JsonCodec, KeyLocator, Name, PacketCodec, Result,
    SystemTimeSource, TimeSource, TrustError,
};

/// Replay guard tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayPolicyOptions {
    /// Allowed skew between a first-sighting timestamp and receipt time
    pub grace_period: Duration,
    /// How long a record survives without a refresh
    pub record_ttl: Duration,
    /// Upper bound on records; `None` is unbounded
    pub max_records: Option<usize>,
}

impl Default for ReplayPolicyOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(120),
            record_ttl: Duration::from_secs(3600),
            max_records: Some(1000),
        }
    }
}

impl ReplayPolicyOptions {
    /// Reject options that would make every record expire immediately
    pub fn validate(&self) -> Result<()> {
        if self.record_ttl.is_zero() {
            return Err(TrustError::config("record_ttl must be positive"));
        }
        Ok(())
    }
}

/// Wraps an inner policy with request timestamp checks
pub struct ReplayGuard<P> {
    inner: P,
    options: ReplayPolicyOptions,
    cache: Mutex<ReplayCache>,
    clock: Arc<dyn TimeSource>,
    codec: Arc<dyn PacketCodec>,
}

impl<P: ValidationPolicy> ReplayGuard<P> {
    /// Guard `inner` using the system clock and the JSON codec
    pub fn new(inner: P, options: ReplayPolicyOptions) -> Result<Self> {
        Self::with_effects(
            inner,
            options,
            Arc::new(SystemTimeSource::new()),
            Arc::new(JsonCodec),
        )
    }

    /// Guard `inner` with explicit clock and codec
    pub fn with_effects(
        inner: P,
        options: ReplayPolicyOptions,
        clock: Arc<dyn TimeSource>,
        codec: Arc<dyn PacketCodec>,
    ) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            inner,
            options,
            cache: Mutex::new(ReplayCache::new()),
            clock,
            codec,
        })
    }

    /// The wrapped policy
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Active options
    pub fn options(&self) -> &ReplayPolicyOptions {
        &self.options
    }

    /// Number of live replay records
    pub fn record_count(&self) -> usize {
        self.cache.lock().len()
    }

    /// Stored timestamp for a signer key
    pub fn last_timestamp(&self, key_name: &Name) -> Option<u64> {
        self.cache.lock().get(key_name).map(|record| record.timestamp)
    }

    fn cleanup(&self, cache: &mut ReplayCache, now: Duration) {
        let evicted = cache.cleanup(now, self.options.record_ttl, self.options.max_records);
        if evicted > 0 {
            tracing::debug!(evicted, "replay records cleaned up");
        }
    }

    // Structural checks; yields (signer key name, timestamp).
    fn parse_request(&self, interest: &Interest) -> std::result::Result<(Name, u64), ValidationOutcome> {
        let name = &interest.name;
        if name.len() < signed_interest::MIN_SIZE {
            return Err(ValidationOutcome::fail(
                ValidationErrorKind::PolicyError,
                format!("Command interest name `{name}` is too short"),
            ));
        }

        let timestamp = interest
            .timestamp_component()
            .and_then(|component| component.to_number())
            .ok_or_else(|| {
                ValidationOutcome::fail(
                    ValidationErrorKind::PolicyError,
                    format!("Command interest `{name}` doesn't include timestamp component"),
                )
            })?;

        let info = interest.signature_info(self.codec.as_ref()).map_err(|err| {
            tracing::warn!(%name, error = %err, "undecodable signature info");
            ValidationOutcome::fail(
                ValidationErrorKind::PolicyError,
                format!("Command interest `{name}` does not include SignatureInfo component"),
            )
        })?;

        let locator = match info.key_locator {
            None => {
                return Err(ValidationOutcome::fail(
                    ValidationErrorKind::InvalidKeyLocator,
                    format!("Command interest `{name}` does not include KeyLocator"),
                ))
            }
            Some(KeyLocator::KeyDigest(_)) => {
                return Err(ValidationOutcome::fail(
                    ValidationErrorKind::InvalidKeyLocator,
                    format!("Command interest `{name}` must include KeyLocator of type KeyName"),
                ))
            }
            Some(KeyLocator::Name(locator)) => locator,
        };

        let key_name = key_name_from_locator(&locator).map_err(|_| {
            ValidationOutcome::fail(
                ValidationErrorKind::InvalidKeyLocator,
                format!("Command interest `{name}` signed by `{locator}` violates naming conventions"),
            )
        })?;

        Ok((key_name, timestamp))
    }

    fn check_timestamp(
        &self,
        interest: &Interest,
        key_name: &Name,
        timestamp: u64,
        receive_ms: u64,
    ) -> ValidationOutcome {
        let mut cache = self.cache.lock();
        let now = self.clock.monotonic();
        // The inner policy ran unlocked; expire against the current time.
        self.cleanup(&mut cache, now);
        match cache.record(
            key_name,
            timestamp,
            receive_ms,
            now,
            self.options.grace_period,
            self.options.max_records,
        ) {
            Ok(()) => ValidationOutcome::Accepted,
            Err(ReplayRejection::OutOfGrace) => ValidationOutcome::fail(
                ValidationErrorKind::PolicyError,
                format!(
                    "Timestamp is out of grace for key `{key_name}` in `{}`",
                    interest.name
                ),
            ),
            Err(ReplayRejection::Reordered { last }) => ValidationOutcome::fail(
                ValidationErrorKind::PolicyError,
                format!(
                    "Timestamp is reordered for key `{key_name}` in `{}` ({timestamp} <= {last})",
                    interest.name
                ),
            ),
        }
    }
}

impl<P: ValidationPolicy> ValidationPolicy for ReplayGuard<P> {
    fn check_data(&self, data: &Data) -> ValidationOutcome {
        self.inner.check_data(data)
    }

    fn trust_anchors(&self) -> Option<&TrustAnchorSet> {
        self.inner.trust_anchors()
    }

    fn check_interest(&self, interest: &Interest) -> ValidationOutcome {
        let receive_ms = self.clock.wall_clock_ms();
        self.cleanup(&mut self.cache.lock(), self.clock.monotonic());

        let (key_name, timestamp) = match self.parse_request(interest) {
            Ok(parsed) => parsed,
            Err(outcome) => return outcome,
        };

        let inner = self.inner.check_interest(interest);
        if !inner.is_success() {
            return inner;
        }

        match self.check_timestamp(interest, &key_name, timestamp, receive_ms) {
            ValidationOutcome::Accepted => inner,
            rejected => {
                tracing::debug!(name = %interest.name, key = %key_name, "replay check rejected request");
                rejected
            }
        }
    }
}

impl<P> std::fmt::Debug for ReplayGuard<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("options", &self.options)
            .field("records", &self.cache.lock().len())
            .finish_non_exhaustive()
    }
}
