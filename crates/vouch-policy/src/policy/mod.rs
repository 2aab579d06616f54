//! Validation policies
//!
//! A policy makes one decision per packet and reports it as a
//! [`ValidationOutcome`]. Walking the certificate chain that a
//! `RequestCertificate` outcome starts is the driver's job (see
//! [`Validator`](crate::validator::Validator)).

mod accept_all;
mod command;
mod config;
mod relative;
mod replay;
mod replay_cache;

pub use accept_all::AcceptAllPolicy;
pub use command::{CommandPolicy, DEFAULT_COMMAND_GRACE};
pub use config::ConfigPolicy;
pub use relative::{RegexPolicy, RelativeOp, RelativeRule};
pub use replay::{ReplayGuard, ReplayPolicyOptions};
pub use replay_cache::{ReplayCache, ReplayRecord, ReplayRejection};

use crate::anchors::TrustAnchorSet;
use crate::outcome::ValidationOutcome;
use std::sync::Arc;
use vouch_core::{Data, Interest, Packet};

/// Per-packet trust decision
pub trait ValidationPolicy: Send + Sync {
    /// Decide on a data packet
    fn check_data(&self, data: &Data) -> ValidationOutcome;

    /// Decide on a signed request
    fn check_interest(&self, interest: &Interest) -> ValidationOutcome;

    /// Dispatch on packet kind
    fn check_packet(&self, packet: Packet<'_>) -> ValidationOutcome {
        match packet {
            Packet::Data(data) => self.check_data(data),
            Packet::Interest(interest) => self.check_interest(interest),
        }
    }

    /// Anchors the policy was configured with; the driver stops a chain at
    /// any of them
    fn trust_anchors(&self) -> Option<&TrustAnchorSet> {
        None
    }
}

/// Run `policy` on `packet` and hand the outcome to `continuation`
pub fn check_policy<P, F, R>(policy: &P, packet: Packet<'_>, continuation: F) -> R
where
    P: ValidationPolicy + ?Sized,
    F: FnOnce(ValidationOutcome) -> R,
{
    continuation(policy.check_packet(packet))
}

impl<P: ValidationPolicy + ?Sized> ValidationPolicy for Arc<P> {
    fn check_data(&self, data: &Data) -> ValidationOutcome {
        (**self).check_data(data)
    }

    fn check_interest(&self, interest: &Interest) -> ValidationOutcome {
        (**self).check_interest(interest)
    }

    fn trust_anchors(&self) -> Option<&TrustAnchorSet> {
        (**self).trust_anchors()
    }
}

impl<P: ValidationPolicy + ?Sized> ValidationPolicy for Box<P> {
    fn check_data(&self, data: &Data) -> ValidationOutcome {
        (**self).check_data(data)
    }

    fn check_interest(&self, interest: &Interest) -> ValidationOutcome {
        (**self).check_interest(interest)
    }

    fn trust_anchors(&self) -> Option<&TrustAnchorSet> {
        (**self).trust_anchors()
    }
}
