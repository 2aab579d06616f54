//! Relative-regex policy
//!
//! Each rule relates an expansion of the data name to an expansion of the
//! signer name:
//!
//! ```text
//! (data regex, data expand)  OP  (signer regex, signer expand)
//!
//! ==   expansions are equal
//! >=   signer expansion is a prefix of the data expansion
//! >    signer expansion is a strict prefix of the data expansion
//! ```
//!
//! Negative rules are consulted first and reject on a match; the first
//! satisfied positive rule asks for the signer's certificate.

use super::ValidationPolicy;
use crate::filter::RelationKind;
use crate::key_locator::CapturePattern;
use crate::outcome::{ValidationErrorKind, ValidationOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;
use vouch_core::{Data, Interest, Name, Result, TrustError};

/// Comparison between data and signer expansions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeOp {
    /// `==`
    Equal,
    /// `>=`
    PrefixOrEqual,
    /// `>`
    StrictPrefix,
}

impl RelativeOp {
    /// Parse `==`, `>=` or `>`
    pub fn parse(text: &str) -> Result<Self> {
        match text.trim() {
            "==" => Ok(Self::Equal),
            ">=" => Ok(Self::PrefixOrEqual),
            ">" => Ok(Self::StrictPrefix),
            other => Err(TrustError::config(format!("Unknown relative op `{other}`"))),
        }
    }

    fn relation(self) -> RelationKind {
        match self {
            Self::Equal => RelationKind::Equal,
            Self::PrefixOrEqual => RelationKind::IsPrefixOf,
            Self::StrictPrefix => RelationKind::IsStrictPrefixOf,
        }
    }
}

impl fmt::Display for RelativeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Equal => "==",
            Self::PrefixOrEqual => ">=",
            Self::StrictPrefix => ">",
        })
    }
}

/// One data/signer relation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeRule {
    data: CapturePattern,
    op: RelativeOp,
    signer: CapturePattern,
}

impl RelativeRule {
    /// Compile a rule
    pub fn new(
        data_regex: &str,
        data_expand: &str,
        op: &str,
        signer_regex: &str,
        signer_expand: &str,
    ) -> Result<Self> {
        Ok(Self {
            data: CapturePattern::new(data_regex, data_expand)?,
            op: RelativeOp::parse(op)?,
            signer: CapturePattern::new(signer_regex, signer_expand)?,
        })
    }

    /// Whether the rule selects `data_name` at all
    pub fn matches_data(&self, data_name: &Name) -> bool {
        self.data.derive(data_name).is_some()
    }

    /// Whether `signer` relates to `data_name` as required
    pub fn satisfied(&self, data_name: &Name, signer: &Name) -> bool {
        let (Some(data), Some(signer)) = (self.data.derive(data_name), self.signer.derive(signer))
        else {
            return false;
        };
        self.op.relation().holds(&signer, &data)
    }
}

/// Policy over positive and negative relative rules
#[derive(Debug, Clone, Default)]
pub struct RegexPolicy {
    verify: Vec<RelativeRule>,
    reject: Vec<RelativeRule>,
}

impl RegexPolicy {
    /// Empty policy; rejects every data packet
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule that authorizes a signer
    pub fn add_positive(&mut self, rule: RelativeRule) {
        self.verify.push(rule);
    }

    /// Add a rule whose match rejects outright
    pub fn add_negative(&mut self, rule: RelativeRule) {
        self.reject.push(rule);
    }
}

impl ValidationPolicy for RegexPolicy {
    fn check_data(&self, data: &Data) -> ValidationOutcome {
        let Some(signer) = data
            .signature_info
            .as_ref()
            .and_then(|info| info.key_locator_name())
        else {
            return ValidationOutcome::fail(
                ValidationErrorKind::InvalidKeyLocator,
                format!("Data `{}` has no name key locator", data.name),
            );
        };

        if self.reject.iter().any(|rule| rule.satisfied(&data.name, signer)) {
            tracing::debug!(name = %data.name, key = %signer, "negative rule matched");
            return ValidationOutcome::fail(
                ValidationErrorKind::PolicyViolation,
                format!("Data `{}` matched negative rule", data.name),
            );
        }

        if self.verify.iter().any(|rule| rule.satisfied(&data.name, signer)) {
            return ValidationOutcome::RequestCertificate(signer.clone());
        }

        ValidationOutcome::fail(
            ValidationErrorKind::PolicyViolation,
            format!("No policy found for data `{}`", data.name),
        )
    }

    fn check_interest(&self, interest: &Interest) -> ValidationOutcome {
        ValidationOutcome::fail(
            ValidationErrorKind::PolicyError,
            format!("Policy doesn't support interest validation: `{}`", interest.name),
        )
    }
}
