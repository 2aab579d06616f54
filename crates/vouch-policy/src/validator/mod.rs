//! Validation driver
//!
//! The driver owns the loop a policy's `RequestCertificate` outcome implies:
//!
//! ```text
//! packet ──policy──► RequestCertificate(n) ──anchor?──► verify chain
//!                          │                   no
//!                          ▼
//!                 depth / loop checks ──► fetch(n) ──policy──► ...
//! ```
//!
//! Anchors come from the driver's own set and from the policy's
//! [`trust_anchors`](crate::policy::ValidationPolicy::trust_anchors). Once the
//! walk reaches a trust anchor (or a certificate the policy accepts
//! outright) the collected chain is verified from the trusted end down to
//! the original packet.

mod fetcher;

pub use fetcher::{CertificateFetcher, FetchError, MemoryFetcher, OfflineFetcher};

use crate::anchors::{TrustAnchor, TrustAnchorSet};
use crate::outcome::{ValidationError, ValidationErrorKind, ValidationOutcome};
use crate::policy::{AcceptAllPolicy, ValidationPolicy};
use std::sync::Arc;
use vouch_core::effects::verify_digest_sha256;
use vouch_core::{
    Certificate, Data, Interest, JsonCodec, Name, Packet, PacketCodec, SignatureInfo,
    SignatureType, SignatureVerifier,
};

/// Maximum number of certificates fetched for one packet
pub const DEFAULT_MAX_DEPTH: usize = 25;

/// Chain-walking validator
pub struct Validator<P> {
    policy: P,
    anchors: TrustAnchorSet,
    fetcher: Arc<dyn CertificateFetcher>,
    verifier: Arc<dyn SignatureVerifier>,
    codec: Arc<dyn PacketCodec>,
    max_depth: usize,
}

impl Validator<AcceptAllPolicy> {
    /// Validator that accepts every packet without verification
    pub fn accept_all() -> Self {
        Self::new(
            AcceptAllPolicy,
            TrustAnchorSet::new(),
            Arc::new(OfflineFetcher),
            Arc::new(|_: &[u8], _: &[u8], _: &[u8]| false),
        )
    }
}

impl<P: ValidationPolicy> Validator<P> {
    /// Create a validator
    pub fn new(
        policy: P,
        anchors: TrustAnchorSet,
        fetcher: Arc<dyn CertificateFetcher>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            policy,
            anchors,
            fetcher,
            verifier,
            codec: Arc::new(JsonCodec),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Use `codec` to encode signed portions of data packets
    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn PacketCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Bound the number of certificates fetched per packet
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The policy
    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// Mutable policy access, e.g. to refresh its anchors
    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Anchors given to the driver; the policy may contribute more
    pub fn anchors(&self) -> &TrustAnchorSet {
        &self.anchors
    }

    /// Anchor for `name`, from the driver's set or the policy's
    pub fn find_anchor(&self, name: &Name) -> Option<&TrustAnchor> {
        self.anchors.find(name).or_else(|| {
            self.policy
                .trust_anchors()
                .and_then(|anchors| anchors.find(name))
        })
    }

    /// Validate a data packet
    pub async fn validate_data(&self, data: &Data) -> Result<(), ValidationError> {
        let signature_info = data.signature_info.as_ref().ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::NoSignature,
                format!("Data `{}` is not signed", data.name),
            )
        })?;
        let signed = Signed {
            name: data.name.clone(),
            signature_type: signature_info.signature_type,
            payload: data.signed_portion(self.codec.as_ref()),
            signature: data.signature_value.clone(),
        };
        self.run(Packet::Data(data), signed).await
    }

    /// Validate a signed request
    pub async fn validate_interest(&self, interest: &Interest) -> Result<(), ValidationError> {
        let signature_type = interest
            .signature_info(self.codec.as_ref())
            .map(|info: SignatureInfo| info.signature_type);
        let (Ok(signature_type), Some(signature)) = (signature_type, interest.signature_value())
        else {
            return Err(ValidationError::new(
                ValidationErrorKind::NoSignature,
                format!("Interest `{}` is not signed", interest.name),
            ));
        };
        let signed = Signed {
            name: interest.name.clone(),
            signature_type,
            payload: interest.signed_portion(),
            signature: signature.to_vec(),
        };
        self.run(Packet::Interest(interest), signed).await
    }

    async fn run(&self, packet: Packet<'_>, original: Signed) -> Result<(), ValidationError> {
        let mut next = match self.policy.check_packet(packet) {
            ValidationOutcome::Accepted => return Ok(()),
            ValidationOutcome::Failed(err) => return Err(err),
            ValidationOutcome::RequestCertificate(name) => name,
        };

        let mut chain: Vec<Certificate> = Vec::new();
        loop {
            if let Some(anchor) = self.find_anchor(&next) {
                tracing::debug!(
                    name = %original.name,
                    anchor = %anchor.key_name(),
                    depth = chain.len(),
                    "reached trust anchor"
                );
                let trusted = anchor.public_key().to_vec();
                return self.verify_chain(&original, &chain, &trusted);
            }

            if chain.len() >= self.max_depth {
                return Err(ValidationError::new(
                    ValidationErrorKind::ExceededDepthLimit,
                    format!(
                        "Exceeded validation depth limit ({}) validating `{}`",
                        self.max_depth, original.name
                    ),
                ));
            }
            if chain.iter().any(|seen| next.is_prefix_of(seen.name())) {
                return Err(ValidationError::new(
                    ValidationErrorKind::LoopDetected,
                    format!("Loop detected in certificate chain at `{next}`"),
                ));
            }

            let certificate = self.fetcher.fetch(&next).await.map_err(|err| {
                ValidationError::new(ValidationErrorKind::CannotRetrieveCertificate, err.to_string())
            })?;
            tracing::debug!(certificate = %certificate.name(), depth = chain.len() + 1, "certificate fetched");

            match self.policy.check_data(certificate.data()) {
                ValidationOutcome::Accepted => {
                    let trusted = certificate.public_key().to_vec();
                    return self.verify_chain(&original, &chain, &trusted);
                }
                ValidationOutcome::Failed(err) => return Err(err),
                ValidationOutcome::RequestCertificate(name) => {
                    chain.push(certificate);
                    next = name;
                }
            }
        }
    }

    // `chain[i]` signed the element before it; `trusted` signed the last one.
    fn verify_chain(
        &self,
        original: &Signed,
        chain: &[Certificate],
        trusted: &[u8],
    ) -> Result<(), ValidationError> {
        let mut key = trusted.to_vec();
        for certificate in chain.iter().rev() {
            self.verify_one(&self.signed_certificate(certificate)?, &key)?;
            key = certificate.public_key().to_vec();
        }
        self.verify_one(original, &key)
    }

    fn signed_certificate(&self, certificate: &Certificate) -> Result<Signed, ValidationError> {
        let data = certificate.data();
        let info = data.signature_info.as_ref().ok_or_else(|| {
            ValidationError::new(
                ValidationErrorKind::NoSignature,
                format!("Certificate `{}` is not signed", data.name),
            )
        })?;
        Ok(Signed {
            name: data.name.clone(),
            signature_type: info.signature_type,
            payload: data.signed_portion(self.codec.as_ref()),
            signature: data.signature_value.clone(),
        })
    }

    fn verify_one(&self, signed: &Signed, public_key: &[u8]) -> Result<(), ValidationError> {
        let valid = match signed.signature_type {
            SignatureType::DigestSha256 => verify_digest_sha256(&signed.payload, &signed.signature),
            SignatureType::Sha256WithRsa | SignatureType::Sha256WithEcdsa => {
                self.verifier
                    .verify(&signed.payload, &signed.signature, public_key)
            }
        };
        if valid {
            Ok(())
        } else {
            Err(ValidationError::new(
                ValidationErrorKind::InvalidSignature,
                format!("Invalid signature on `{}`", signed.name),
            ))
        }
    }
}

impl<P> std::fmt::Debug for Validator<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("anchors", &self.anchors)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

struct Signed {
    name: Name,
    signature_type: SignatureType,
    payload: Vec<u8>,
    signature: Vec<u8>,
}
