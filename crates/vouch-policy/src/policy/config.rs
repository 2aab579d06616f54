//! Config-driven rule selection

use super::ValidationPolicy;
use crate::anchors::{AnchorSpec, TrustAnchor, TrustAnchorSet};
use crate::config::{ConfigSection, ConfigValue};
use crate::outcome::{ValidationErrorKind, ValidationOutcome};
use crate::rule::{Rule, RuleTarget};
use std::path::Path;
use std::sync::Arc;
use vouch_core::{
    Certificate, Data, Interest, JsonCodec, KeyLocator, Name, Packet, PacketCodec, Result,
    TrustError,
};

/// Trust schema evaluation over ordered rules.
///
/// Built once with [`load`](Self::load) (or [`add_rule`](Self::add_rule) and
/// [`add_trust_anchor`](Self::add_trust_anchor)), then shared read-only.
pub struct ConfigPolicy {
    configured: bool,
    should_validate: bool,
    data_rules: Vec<Rule>,
    interest_rules: Vec<Rule>,
    anchors: TrustAnchorSet,
    codec: Arc<dyn PacketCodec>,
}

impl ConfigPolicy {
    /// Empty policy using the JSON codec
    pub fn new() -> Self {
        Self::with_codec(Arc::new(JsonCodec))
    }

    /// Empty policy using `codec` for signature info and certificates
    pub fn with_codec(codec: Arc<dyn PacketCodec>) -> Self {
        Self {
            configured: false,
            should_validate: true,
            data_rules: Vec::new(),
            interest_rules: Vec::new(),
            anchors: TrustAnchorSet::new(),
            codec,
        }
    }

    /// Load a parsed trust schema.
    ///
    /// `filename` names the schema in errors and anchors relative anchor
    /// paths. Loaded rules and anchors are added after anything installed
    /// with [`add_rule`](Self::add_rule) or
    /// [`add_trust_anchor`](Self::add_trust_anchor). A policy can be loaded
    /// once; a failed load adds nothing.
    pub fn load(&mut self, section: &ConfigSection, filename: &str) -> Result<()> {
        if self.configured {
            return Err(TrustError::config(
                "ConfigPolicy can be configured only once",
            ));
        }
        self.configured = true;

        if section.is_empty() {
            return Err(TrustError::config(format!(
                "Error processing configuration file: {filename} no data"
            )));
        }

        let base_dir = Path::new(filename).parent().unwrap_or_else(|| Path::new(""));
        let mut data_rules = Vec::new();
        let mut interest_rules = Vec::new();
        let mut anchor_specs = Vec::new();

        for (key, value) in section.iter() {
            let ConfigValue::Section(body) = value else {
                return Err(TrustError::config(format!(
                    "Error processing configuration file: {filename} expecting section <{key}>"
                )));
            };
            if key.eq_ignore_ascii_case("rule") {
                let (target, rule) = Rule::from_config(body)?;
                match target {
                    RuleTarget::Data => data_rules.push(rule),
                    RuleTarget::Interest => interest_rules.push(rule),
                }
            } else if key.eq_ignore_ascii_case("trust-anchor") {
                anchor_specs.push(AnchorSpec::from_config(body, base_dir)?);
            } else {
                return Err(TrustError::config(format!(
                    "Error processing configuration file: {filename} unrecognized section: {key}"
                )));
            }
        }

        let mut anchors = TrustAnchorSet::new();
        let mut should_validate = true;
        for spec in anchor_specs {
            should_validate &= self.install_anchor(&mut anchors, spec)?;
        }

        tracing::debug!(
            filename,
            data_rules = data_rules.len(),
            interest_rules = interest_rules.len(),
            anchors = anchors.len(),
            should_validate,
            "trust schema loaded"
        );

        self.data_rules.extend(data_rules);
        self.interest_rules.extend(interest_rules);
        self.anchors.merge(anchors);
        self.should_validate &= should_validate;
        Ok(())
    }

    /// Append a rule for `target`
    pub fn add_rule(&mut self, target: RuleTarget, rule: Rule) {
        match target {
            RuleTarget::Data => self.data_rules.push(rule),
            RuleTarget::Interest => self.interest_rules.push(rule),
        }
    }

    /// Install an anchor source; [`AnchorSpec::Any`] disables validation
    pub fn add_trust_anchor(&mut self, spec: AnchorSpec) -> Result<()> {
        let mut anchors = std::mem::take(&mut self.anchors);
        let result = self.install_anchor(&mut anchors, spec);
        self.anchors = anchors;
        if !result? {
            self.should_validate = false;
        }
        Ok(())
    }

    // Returns whether validation stays enabled.
    fn install_anchor(&self, anchors: &mut TrustAnchorSet, spec: AnchorSpec) -> Result<bool> {
        match spec {
            AnchorSpec::File { path, refresh } => {
                anchors.add_source(path, false, refresh, self.codec.as_ref())?;
            }
            AnchorSpec::Dir { path, refresh } => {
                anchors.add_source(path, true, refresh, self.codec.as_ref())?;
            }
            AnchorSpec::Base64(text) => {
                let certificate = Certificate::from_base64(&text, self.codec.as_ref())?;
                anchors.insert(TrustAnchor::from_certificate(certificate));
            }
            AnchorSpec::Any => {
                tracing::warn!("trust-anchor type any: validation disabled");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Re-read file and directory anchors
    pub fn refresh_anchors(&mut self) -> Result<usize> {
        self.anchors.reload(self.codec.as_ref())
    }

    /// Loaded trust anchors
    pub fn anchors(&self) -> &TrustAnchorSet {
        &self.anchors
    }

    /// Rules for data packets, in declared order
    pub fn data_rules(&self) -> &[Rule] {
        &self.data_rules
    }

    /// Rules for signed requests, in declared order
    pub fn interest_rules(&self) -> &[Rule] {
        &self.interest_rules
    }

    /// False when a `type any` anchor disabled validation
    pub fn should_validate(&self) -> bool {
        self.should_validate
    }

    /// Codec used to decode signature info and certificates
    pub fn codec(&self) -> &Arc<dyn PacketCodec> {
        &self.codec
    }
}

fn signer_name<'a>(
    packet_name: &Name,
    locator: Option<&'a KeyLocator>,
) -> std::result::Result<&'a Name, ValidationOutcome> {
    match locator {
        None => Err(ValidationOutcome::fail(
            ValidationErrorKind::InvalidKeyLocator,
            format!("Required key locator is missing in `{packet_name}`"),
        )),
        Some(KeyLocator::KeyDigest(_)) => Err(ValidationOutcome::fail(
            ValidationErrorKind::InvalidKeyLocator,
            format!("Key locator not Name in `{packet_name}`"),
        )),
        Some(KeyLocator::Name(name)) => Ok(name),
    }
}

impl Default for ConfigPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigPolicy")
            .field("configured", &self.configured)
            .field("should_validate", &self.should_validate)
            .field("data_rules", &self.data_rules)
            .field("interest_rules", &self.interest_rules)
            .field("anchors", &self.anchors)
            .finish_non_exhaustive()
    }
}

impl ValidationPolicy for ConfigPolicy {
    fn check_data(&self, data: &Data) -> ValidationOutcome {
        if !self.should_validate {
            return ValidationOutcome::Accepted;
        }

        let locator = data
            .signature_info
            .as_ref()
            .and_then(|info| info.key_locator.as_ref());
        let signer = match signer_name(&data.name, locator) {
            Ok(signer) => signer,
            Err(outcome) => return outcome,
        };

        let packet = Packet::Data(data);
        for rule in &self.data_rules {
            if !rule.matches(packet) {
                continue;
            }
            if rule.check(packet, self.codec.as_ref()) {
                tracing::debug!(rule_id = %rule.id(), name = %data.name, key = %signer, "rule accepted data");
                return ValidationOutcome::RequestCertificate(signer.clone());
            }
            tracing::debug!(rule_id = %rule.id(), name = %data.name, "rule rejected data");
            return ValidationOutcome::fail(
                ValidationErrorKind::PolicyViolation,
                format!("Data `{}` violates rule `{}`", data.name, rule.id()),
            );
        }

        ValidationOutcome::fail(
            ValidationErrorKind::PolicyViolation,
            format!("No rule matched for data `{}`", data.name),
        )
    }

    fn check_interest(&self, interest: &Interest) -> ValidationOutcome {
        if !self.should_validate {
            return ValidationOutcome::Accepted;
        }

        let info = match interest.signature_info(self.codec.as_ref()) {
            Ok(info) => info,
            Err(err) => {
                tracing::warn!(name = %interest.name, error = %err, "invalid signed interest");
                return ValidationOutcome::fail(
                    ValidationErrorKind::InvalidKeyLocator,
                    format!("Invalid signed interest `{}`", interest.name),
                );
            }
        };
        if let Err(outcome) = signer_name(&interest.name, info.key_locator.as_ref()) {
            return outcome;
        }

        // Rule selection for requests is undefined; never accept on this path.
        tracing::warn!(name = %interest.name, "interest rule evaluation not implemented");
        ValidationOutcome::fail(
            ValidationErrorKind::ImplementationGap,
            format!("Not implemented yet: interest `{}`", interest.name),
        )
    }

    fn trust_anchors(&self) -> Option<&TrustAnchorSet> {
        Some(&self.anchors)
    }
}
