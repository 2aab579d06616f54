//! # Vouch Policy
//!
//! Decides whether a signed packet's name and signer satisfy a trust schema
//! and, when they do, which certificate has to be validated next.
//!
//! - [`filter`], [`key_locator`], [`checker`], [`rule`]: the schema building
//!   blocks, each constructible directly or from a [`config::ConfigSection`]
//! - [`policy`]: the [`ValidationPolicy`] trait and its implementations,
//!   including the config-driven [`ConfigPolicy`] and the anti-replay
//!   [`ReplayGuard`]
//! - [`validator`]: the async driver that walks certificate chains to a
//!   trust anchor
//!
//! ## Usage
//!
//! ```rust
//! use vouch_core::{Data, Name, SignatureInfo, SignatureType};
//! use vouch_policy::config::ConfigSection;
//! use vouch_policy::{ConfigPolicy, ValidationOutcome, ValidationPolicy};
//!
//! let schema = ConfigSection::new().section(
//!     "rule",
//!     ConfigSection::new()
//!         .leaf("id", "hierarchy")
//!         .leaf("for", "data")
//!         .section(
//!             "checker",
//!             ConfigSection::new()
//!                 .leaf("type", "hierarchical")
//!                 .leaf("sig-type", "ecdsa-sha256"),
//!         ),
//! );
//!
//! let mut policy = ConfigPolicy::new();
//! policy.load(&schema, "schema.conf").unwrap();
//!
//! let key = Name::parse("/org/alice/KEY/1").unwrap();
//! let data = Data::new(Name::parse("/org/alice/photos/1").unwrap(), vec![])
//!     .with_signature(SignatureInfo::with_key_name(SignatureType::Sha256WithEcdsa, key.clone()), vec![]);
//!
//! assert_eq!(policy.check_data(&data), ValidationOutcome::RequestCertificate(key));
//! ```

pub mod anchors;
pub mod checker;
pub mod config;
pub mod filter;
pub mod key_locator;
pub mod outcome;
pub mod policy;
pub mod rule;
pub mod validator;

pub use anchors::{AnchorSpec, TrustAnchor, TrustAnchorSet, TrustScope};
pub use checker::{Checker, PacketChecker};
pub use filter::{Filter, NamePattern, RelationKind};
pub use key_locator::{CapturePattern, KeyLocatorRule};
pub use outcome::{ValidationError, ValidationErrorKind, ValidationOutcome};
pub use policy::{
    check_policy, AcceptAllPolicy, CommandPolicy, ConfigPolicy, RegexPolicy, RelativeRule,
    ReplayGuard, ReplayPolicyOptions, ValidationPolicy,
};
pub use rule::{Rule, RuleTarget};
pub use validator::{CertificateFetcher, FetchError, MemoryFetcher, OfflineFetcher, Validator};
