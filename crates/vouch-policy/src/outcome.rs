//! Validation outcomes
//!
//! Every policy decision for one packet is one of three things: accept, fail
//! with a machine-readable kind and a human-readable reason, or ask the driver
//! to fetch and validate the signer's certificate next.
//!
//! ```text
//! Pending ──► Accepted
//!         ├─► Failed(kind, message)
//!         └─► RequestCertificate(name) ──► driver fetches ──► Pending (next step)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use vouch_core::Name;

/// Machine-readable failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationErrorKind {
    /// Packet carries no signature
    NoSignature,
    /// Signature bits do not verify
    InvalidSignature,
    /// Key locator missing, not a name, or violating naming conventions
    InvalidKeyLocator,
    /// Packet name or signer does not satisfy the trust schema rules
    PolicyViolation,
    /// Structural, timestamp or replay semantics not satisfied
    PolicyError,
    /// A policy branch that is deliberately not implemented; always fails closed
    ImplementationGap,
    /// The certificate fetcher could not produce the requested certificate
    CannotRetrieveCertificate,
    /// Chain longer than the driver allows
    ExceededDepthLimit,
    /// A certificate refers back into its own chain
    LoopDetected,
}

impl ValidationErrorKind {
    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            ValidationErrorKind::NoSignature => "no_signature",
            ValidationErrorKind::InvalidSignature => "invalid_signature",
            ValidationErrorKind::InvalidKeyLocator => "invalid_key_locator",
            ValidationErrorKind::PolicyViolation => "policy_violation",
            ValidationErrorKind::PolicyError => "policy_error",
            ValidationErrorKind::ImplementationGap => "implementation_gap",
            ValidationErrorKind::CannotRetrieveCertificate => "cannot_retrieve_certificate",
            ValidationErrorKind::ExceededDepthLimit => "exceeded_depth_limit",
            ValidationErrorKind::LoopDetected => "loop_detected",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A terminal failure for one packet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ValidationError {
    /// Failure classification
    pub kind: ValidationErrorKind,
    /// Reason, naming the offending packet
    pub message: String,
}

impl ValidationError {
    /// Create a validation error
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of one policy step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Packet accepted without further chain walking
    Accepted,
    /// Packet rejected; terminal
    Failed(ValidationError),
    /// Packet passed the rules; the named certificate must be validated next
    RequestCertificate(Name),
}

impl ValidationOutcome {
    /// Shorthand for a failure outcome
    pub fn fail(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self::Failed(ValidationError::new(kind, message))
    }

    /// Whether the packet was accepted outright
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Whether the step did not fail
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }

    /// The failure, if any
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// The requested certificate name, if any
    pub fn requested_certificate(&self) -> Option<&Name> {
        match self {
            Self::RequestCertificate(name) => Some(name),
            _ => None,
        }
    }
}
