//! Ed25519 signing and verification of attestations.
//!
//! Public keys travel as `did:key:z<base58btc>` strings whose decoded
//! payload is the multicodec prefix `0xed 0x01` followed by the 32-byte
//! public key. Signatures cover the canonical byte form and are stored hex
//! encoded.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};
use thiserror::Error;

use crate::attestation::Attestation;
use crate::canonical::canonical_bytes;

/// Prefix of every did:key identifier (the `z` marks base58btc).
pub const DID_KEY_PREFIX: &str = "did:key:z";

/// Multicodec prefix for Ed25519 public keys.
const MULTICODEC_ED25519: [u8; 2] = [0xed, 0x01];

#[derive(Debug, Error)]
pub enum SignError {
    #[error("malformed DID '{0}': expected did:key:z prefix")]
    MalformedDid(String),

    #[error("invalid base58 payload in DID: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("DID payload does not carry the ed25519 multicodec prefix")]
    WrongMulticodec,

    #[error("invalid key or signature material: {0}")]
    Crypto(#[from] ed25519_dalek::SignatureError),

    #[error("invalid signature encoding: {0}")]
    SignatureEncoding(#[from] hex::FromHexError),

    #[error("signature verification failed for attestation {0}")]
    VerificationFailed(String),

    #[error("canonical encoding failed: {0}")]
    Canonical(#[from] serde_json::Error),
}

/// Encode a verifying key as a did:key string.
pub fn encode_did_key(key: &VerifyingKey) -> String {
    let mut payload = Vec::with_capacity(2 + 32);
    payload.extend_from_slice(&MULTICODEC_ED25519);
    payload.extend_from_slice(key.as_bytes());
    format!("{}{}", DID_KEY_PREFIX, bs58::encode(payload).into_string())
}

/// Decode a did:key string back into a verifying key.
pub fn decode_did_key(did: &str) -> Result<VerifyingKey, SignError> {
    let encoded = did
        .strip_prefix(DID_KEY_PREFIX)
        .ok_or_else(|| SignError::MalformedDid(did.to_string()))?;

    let payload = bs58::decode(encoded).into_vec()?;
    if payload.len() != 2 + 32 || payload[..2] != MULTICODEC_ED25519 {
        return Err(SignError::WrongMulticodec);
    }

    let mut key_bytes = [0u8; 32];
    key_bytes.copy_from_slice(&payload[2..]);
    Ok(VerifyingKey::from_bytes(&key_bytes)?)
}

/// An attestation signer bound to one Ed25519 keypair.
pub struct AttestationSigner {
    key: SigningKey,
    did: String,
}

impl AttestationSigner {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        let key = SigningKey::from_bytes(secret);
        let did = encode_did_key(&key.verifying_key());
        Self { key, did }
    }

    /// The did:key identifier recorded on signed attestations.
    pub fn did(&self) -> &str {
        &self.did
    }

    /// Sign an attestation in place.
    ///
    /// A no-op when a signature is already present, honouring signatures
    /// carried over from replication.
    pub fn sign(&self, attestation: &mut Attestation) -> Result<(), SignError> {
        if !attestation.signature.is_empty() {
            return Ok(());
        }

        let bytes = canonical_bytes(attestation)?;
        let signature = self.key.sign(&bytes);
        attestation.signature = hex::encode(signature.to_bytes());
        attestation.signer_did = self.did.clone();
        Ok(())
    }
}

/// Verify an attestation's signature against its canonical form.
///
/// An empty signature passes for backward compatibility with unsigned
/// records. Any inconsistency in a present signature is a hard error.
pub fn verify(attestation: &Attestation) -> Result<(), SignError> {
    if attestation.signature.is_empty() {
        return Ok(());
    }

    let key = decode_did_key(&attestation.signer_did)?;
    let signature_bytes = hex::decode(&attestation.signature)?;
    let signature = Signature::from_slice(&signature_bytes)?;

    let bytes = canonical_bytes(attestation)?;
    key.verify(&bytes, &signature)
        .map_err(|_| SignError::VerificationFailed(attestation.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attestation::AttestationBuilder;
    use rand::rngs::OsRng;
    use rand::RngCore;

    fn test_signer() -> AttestationSigner {
        let mut secret = [0u8; 32];
        OsRng.fill_bytes(&mut secret);
        AttestationSigner::from_bytes(&secret)
    }

    fn sample() -> Attestation {
        AttestationBuilder::new()
            .id("AS-ALICE-00aabbcc")
            .subject("ALICE")
            .predicate("works_at")
            .context("acme")
            .actor("human:bob")
            .timestamp(1704067200000)
            .source("cli")
            .build()
    }

    #[test]
    fn did_roundtrip() {
        let signer = test_signer();
        let did = signer.did().to_string();
        assert!(did.starts_with("did:key:z"));

        let key = decode_did_key(&did).unwrap();
        assert_eq!(encode_did_key(&key), did);
    }

    #[test]
    fn sign_and_verify() {
        let signer = test_signer();
        let mut attestation = sample();

        signer.sign(&mut attestation).unwrap();
        assert!(!attestation.signature.is_empty());
        assert_eq!(attestation.signer_did, signer.did());
        assert!(attestation.signature_fields_consistent());

        verify(&attestation).unwrap();
    }

    #[test]
    fn unsigned_verifies() {
        verify(&sample()).unwrap();
    }

    #[test]
    fn existing_signature_is_honoured() {
        let signer = test_signer();
        let mut attestation = sample();
        attestation.signature = "0011".to_string();
        attestation.signer_did = "did:key:zReplicated".to_string();

        signer.sign(&mut attestation).unwrap();
        assert_eq!(attestation.signature, "0011");
        assert_eq!(attestation.signer_did, "did:key:zReplicated");
    }

    #[test]
    fn mutation_invalidates_signature() {
        let signer = test_signer();

        let mut mutated_subject = sample();
        signer.sign(&mut mutated_subject).unwrap();
        mutated_subject.subjects[0] = "MALLORY".to_string();
        assert!(verify(&mutated_subject).is_err());

        let mut mutated_timestamp = sample();
        signer.sign(&mut mutated_timestamp).unwrap();
        mutated_timestamp.timestamp += 1;
        assert!(verify(&mutated_timestamp).is_err());

        let mut mutated_actor = sample();
        signer.sign(&mut mutated_actor).unwrap();
        mutated_actor.actors.push("intruder".to_string());
        assert!(verify(&mutated_actor).is_err());
    }

    #[test]
    fn created_at_does_not_affect_signature() {
        let signer = test_signer();
        let mut attestation = sample();
        signer.sign(&mut attestation).unwrap();

        attestation.created_at = 123_456_789;
        verify(&attestation).unwrap();
    }

    #[test]
    fn malformed_did_is_hard_error() {
        let signer = test_signer();
        let mut attestation = sample();
        signer.sign(&mut attestation).unwrap();

        attestation.signer_did = "did:web:example.com".to_string();
        assert!(matches!(
            verify(&attestation),
            Err(SignError::MalformedDid(_))
        ));
    }

    #[test]
    fn wrong_multicodec_rejected() {
        let mut payload = vec![0xec, 0x01];
        payload.extend_from_slice(&[0u8; 32]);
        let did = format!("did:key:z{}", bs58::encode(payload).into_string());
        assert!(matches!(
            decode_did_key(&did),
            Err(SignError::WrongMulticodec)
        ));
    }
}
