//! # Vouch Core
//!
//! Vocabulary shared by every Vouch crate: hierarchical names and their
//! component-level patterns, the signed packet model, key and certificate
//! naming conventions, the unified error type, and the collaborator traits
//! through which hosts supply codecs, signature verification and clocks.
//!
//! ## Usage
//!
//! ```rust
//! use vouch_core::{ExpandTemplate, Name, NameRegex};
//!
//! let key = Name::parse("/org/alice/KEY/1").unwrap();
//! let pattern = NameRegex::new("^([^<KEY>]*)<KEY><>$").unwrap();
//! let identity = pattern
//!     .captures(&key)
//!     .unwrap()
//!     .expand(&ExpandTemplate::parse("\\1").unwrap())
//!     .unwrap();
//! assert_eq!(identity.to_uri(), "/org/alice");
//! ```

pub mod certificate;
pub mod effects;
pub mod errors;
pub mod name;
pub mod naming;
pub mod packet;
pub mod pattern;

pub use certificate::Certificate;
pub use effects::{
    JsonCodec, ManualTimeSource, PacketCodec, SignatureVerifier, SystemTimeSource, TimeSource,
};
pub use errors::{Result, TrustError};
pub use name::{Component, Name};
pub use packet::{
    signed_interest, Data, Interest, KeyLocator, Packet, SignatureInfo, SignatureKind,
    SignatureType,
};
pub use pattern::{ExpandTemplate, NameRegex, RegexMatch};
