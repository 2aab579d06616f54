use super::ValidationPolicy;
use crate::outcome::ValidationOutcome;
use vouch_core::{Data, Interest};

/// Accepts every packet without chasing a signer
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllPolicy;

impl ValidationPolicy for AcceptAllPolicy {
    fn check_data(&self, _data: &Data) -> ValidationOutcome {
        ValidationOutcome::Accepted
    }

    fn check_interest(&self, _interest: &Interest) -> ValidationOutcome {
        ValidationOutcome::Accepted
    }
}
