//! Scoped command policy
//!
//! Signed command requests are checked against pinned keys directly, without
//! walking a certificate chain. Each pinned key comes with a scope: a regex
//! over request names that the key may sign.

use super::ValidationPolicy;
use crate::anchors::{TrustAnchor, TrustAnchorSet, TrustScope};
use crate::outcome::{ValidationErrorKind, ValidationOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use vouch_core::naming::key_name_from_locator;
use vouch_core::{
    signed_interest, Certificate, Data, Interest, JsonCodec, Name, NameRegex, PacketCodec,
    Result, SignatureVerifier, SystemTimeSource, TimeSource,
};

/// Grace window for a signer's first command
pub const DEFAULT_COMMAND_GRACE: Duration = Duration::from_millis(3000);

/// Verifies signed commands against scoped, pinned keys
pub struct CommandPolicy {
    anchors: TrustAnchorSet,
    grace: Duration,
    last_timestamps: Mutex<HashMap<Name, u64>>,
    verifier: Arc<dyn SignatureVerifier>,
    clock: Arc<dyn TimeSource>,
    codec: Arc<dyn PacketCodec>,
}

impl CommandPolicy {
    /// Policy with the default grace window, system clock and JSON codec
    pub fn new(verifier: Arc<dyn SignatureVerifier>) -> Self {
        Self::with_effects(
            verifier,
            Arc::new(SystemTimeSource::new()),
            Arc::new(JsonCodec),
        )
    }

    /// Policy with explicit clock and codec
    pub fn with_effects(
        verifier: Arc<dyn SignatureVerifier>,
        clock: Arc<dyn TimeSource>,
        codec: Arc<dyn PacketCodec>,
    ) -> Self {
        Self {
            anchors: TrustAnchorSet::new(),
            grace: DEFAULT_COMMAND_GRACE,
            last_timestamps: Mutex::new(HashMap::new()),
            verifier,
            clock,
            codec,
        }
    }

    /// Override the first-sighting grace window
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Let the certificate's key sign requests matching `interest_regex`
    pub fn add_interest_rule(&mut self, interest_regex: &str, certificate: &Certificate) -> Result<()> {
        self.add_interest_rule_for_key(
            interest_regex,
            certificate.key_name(),
            certificate.public_key().to_vec(),
        )
    }

    /// Let `key_name` sign requests matching `interest_regex`
    pub fn add_interest_rule_for_key(
        &mut self,
        interest_regex: &str,
        key_name: Name,
        public_key: Vec<u8>,
    ) -> Result<()> {
        let scope = TrustScope::new(NameRegex::new(interest_regex)?, NameRegex::from_name(&key_name)?);
        self.anchors.add_scope(scope);
        self.anchors.insert(TrustAnchor::from_key(key_name, public_key));
        Ok(())
    }

    /// Pinned keys and scopes
    pub fn anchors(&self) -> &TrustAnchorSet {
        &self.anchors
    }

    fn fail(kind: ValidationErrorKind, message: String) -> ValidationOutcome {
        tracing::debug!(%message, "command rejected");
        ValidationOutcome::fail(kind, message)
    }
}

impl ValidationPolicy for CommandPolicy {
    fn check_data(&self, data: &Data) -> ValidationOutcome {
        Self::fail(
            ValidationErrorKind::PolicyError,
            format!("Command policy does not validate data `{}`", data.name),
        )
    }

    fn check_interest(&self, interest: &Interest) -> ValidationOutcome {
        let name = &interest.name;
        if name.len() < signed_interest::MIN_SIZE {
            return Self::fail(
                ValidationErrorKind::PolicyError,
                format!("Command interest name `{name}` is too short"),
            );
        }

        let info = match interest.signature_info(self.codec.as_ref()) {
            Ok(info) => info,
            Err(err) => {
                return Self::fail(
                    ValidationErrorKind::PolicyError,
                    format!("Command interest `{name}` has malformed SignatureInfo: {err}"),
                )
            }
        };
        let Some(locator) = info.key_locator_name() else {
            return Self::fail(
                ValidationErrorKind::InvalidKeyLocator,
                format!("Command interest `{name}` must include KeyLocator of type KeyName"),
            );
        };
        let Ok(key_name) = key_name_from_locator(locator) else {
            return Self::fail(
                ValidationErrorKind::InvalidKeyLocator,
                format!("Command interest `{name}` signed by `{locator}` violates naming conventions"),
            );
        };

        if !self.anchors.in_scope(name, &key_name) {
            return Self::fail(
                ValidationErrorKind::PolicyViolation,
                format!("Command interest `{name}` is not in the scope of `{key_name}`"),
            );
        }

        let Some(timestamp) = interest.timestamp_component().and_then(|c| c.to_number()) else {
            return Self::fail(
                ValidationErrorKind::PolicyError,
                format!("Command interest `{name}` doesn't include timestamp component"),
            );
        };

        let Some(anchor) = self.anchors.find(&key_name) else {
            return Self::fail(
                ValidationErrorKind::InvalidKeyLocator,
                format!("No pinned key `{key_name}` for command `{name}`"),
            );
        };

        let mut last_timestamps = self.last_timestamps.lock();
        match last_timestamps.get(&key_name) {
            None => {
                let now_ms = self.clock.wall_clock_ms();
                if Duration::from_millis(timestamp.abs_diff(now_ms)) > self.grace {
                    return Self::fail(
                        ValidationErrorKind::PolicyError,
                        format!("Command interest `{name}` timestamp is out of grace"),
                    );
                }
            }
            Some(&last) if timestamp <= last => {
                return Self::fail(
                    ValidationErrorKind::PolicyError,
                    format!("Command interest `{name}` timestamp is not fresh"),
                );
            }
            Some(_) => {}
        }

        let signature = interest.signature_value().unwrap_or_default();
        if !self
            .verifier
            .verify(&interest.signed_portion(), signature, anchor.public_key())
        {
            return Self::fail(
                ValidationErrorKind::InvalidSignature,
                format!("Signature verification failed for command `{name}`"),
            );
        }

        last_timestamps.insert(key_name, timestamp);
        ValidationOutcome::Accepted
    }
}

impl std::fmt::Debug for CommandPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandPolicy")
            .field("anchors", &self.anchors)
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}
