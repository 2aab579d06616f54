//! Shared fixtures for integration tests

#![allow(dead_code)]

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use std::sync::Arc;
use vouch_core::{
    Certificate, Data, Interest, JsonCodec, Name, SignatureInfo, SignatureType, SignatureVerifier,
};

/// Route logs to the test harness; `RUST_LOG=vouch_policy=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn name(uri: &str) -> Name {
    Name::parse(uri).unwrap()
}

/// Ed25519 key pair with a name
pub struct TestKey {
    pub key_name: Name,
    signing: SigningKey,
}

impl TestKey {
    pub fn new(key_name: &str, seed: u8) -> Self {
        Self {
            key_name: name(key_name),
            signing: SigningKey::from_bytes(&[seed; 32]),
        }
    }

    pub fn public_key(&self) -> Vec<u8> {
        self.signing.verifying_key().to_bytes().to_vec()
    }

    fn info(&self) -> SignatureInfo {
        SignatureInfo::with_key_name(SignatureType::Sha256WithEcdsa, self.key_name.clone())
    }

    pub fn sign_data(&self, data: Data) -> Data {
        let unsigned = data.with_signature(self.info(), Vec::new());
        let signature = self.signing.sign(&unsigned.signed_portion(&JsonCodec));
        unsigned.with_signature(self.info(), signature.to_bytes().to_vec())
    }

    /// Certificate for `subject`, issued by this key
    pub fn certify(&self, subject: &TestKey) -> Certificate {
        let cert_name = subject.key_name.append("issuer").append("v1");
        let data = Data::new(cert_name, subject.public_key());
        Certificate::from_data(self.sign_data(data)).unwrap()
    }

    pub fn self_signed(&self) -> Certificate {
        self.certify(self)
    }

    pub fn sign_command(&self, command: &str, timestamp: u64, nonce: u64) -> Interest {
        let command = name(command);
        let unsigned = Interest::signed(&command, timestamp, nonce, &self.info(), Vec::new(), &JsonCodec);
        let signature = self.signing.sign(&unsigned.signed_portion());
        Interest::signed(
            &command,
            timestamp,
            nonce,
            &self.info(),
            signature.to_bytes().to_vec(),
            &JsonCodec,
        )
    }
}

/// Ed25519 behind the verifier seam
pub fn ed25519_verifier() -> Arc<dyn SignatureVerifier> {
    Arc::new(|payload: &[u8], signature: &[u8], public_key: &[u8]| {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        key.verify(payload, &signature).is_ok()
    })
}
