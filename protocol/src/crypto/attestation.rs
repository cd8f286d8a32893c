//! # Attestation Signatures & Signer Recovery
//!
//! The registrar never asks "is this signature valid for key K?" — it asks
//! "*who* signed this digest?", then checks whether that identity is an
//! enabled validator. That inversion is captured by the [`SignerRecovery`]
//! trait, which keeps the issue path independent of the signature scheme.
//!
//! ## Wire format
//!
//! Ed25519 has no ECDSA-style public-key recovery, so the attestation
//! format carries the signer's key as its first component. An attestation
//! signature is exactly 96 bytes, three fixed-width components:
//!
//! ```text
//! pubkey (32) || R (32) || s (32)
//! ```
//!
//! Recovery parses the key (strict point validation — low-order and
//! malformed encodings are rejected), verifies `R || s` over the digest,
//! and returns the key's address as the recovered identity. A forged
//! pubkey component simply fails verification; there is no way to claim an
//! identity you cannot sign for.

use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use thiserror::Error;

use crate::config::{ATTESTATION_SIGNATURE_LENGTH, VERIFYING_KEY_LENGTH};
use crate::crypto::keys::{Address, ArborKeypair};

/// Errors during signer recovery.
///
/// Deliberately coarse — callers fold all of these into their own
/// "invalid signature" condition, and a detailed failure oracle helps only
/// attackers.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The signature blob is not the expected fixed-length encoding.
    #[error("malformed attestation signature: expected {expected} bytes, got {actual}")]
    MalformedSignature {
        /// The required wire length.
        expected: usize,
        /// What arrived instead.
        actual: usize,
    },

    /// The embedded public key is not a valid Ed25519 point, or the
    /// signature does not verify over the digest.
    #[error("signer recovery failed")]
    RecoveryFailed,
}

/// The pluggable signer-recovery capability.
///
/// `recover` either yields the identity that signed `digest`, or fails.
/// The registrar is written entirely against this trait, so swapping the
/// signature scheme (or fronting a hardware verifier) never touches the
/// issuance logic.
pub trait SignerRecovery {
    /// Recover the identity that produced `signature` over `digest`.
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Address, RecoveryError>;
}

/// The production scheme: Ed25519 with the signer's key carried in-band.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Recovery;

impl SignerRecovery for Ed25519Recovery {
    fn recover(&self, digest: &[u8; 32], signature: &[u8]) -> Result<Address, RecoveryError> {
        if signature.len() != ATTESTATION_SIGNATURE_LENGTH {
            return Err(RecoveryError::MalformedSignature {
                expected: ATTESTATION_SIGNATURE_LENGTH,
                actual: signature.len(),
            });
        }

        let (key_bytes, sig_bytes) = signature.split_at(VERIFYING_KEY_LENGTH);
        let key_arr: [u8; 32] = key_bytes
            .try_into()
            .map_err(|_| RecoveryError::RecoveryFailed)?;
        let sig_arr: [u8; 64] = sig_bytes
            .try_into()
            .map_err(|_| RecoveryError::RecoveryFailed)?;

        let verifying_key =
            VerifyingKey::from_bytes(&key_arr).map_err(|_| RecoveryError::RecoveryFailed)?;
        let sig = DalekSignature::from_bytes(&sig_arr);

        verifying_key
            .verify(digest, &sig)
            .map_err(|_| RecoveryError::RecoveryFailed)?;

        Ok(Address(key_arr))
    }
}

/// Produce the 96-byte attestation signature for a digest.
///
/// The off-chain half of [`Ed25519Recovery`] — validators run this over
/// the published issuance digest and hand the result to whoever submits
/// the issue request.
pub fn sign_attestation(keypair: &ArborKeypair, digest: &[u8; 32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(ATTESTATION_SIGNATURE_LENGTH);
    out.extend_from_slice(keypair.address().as_bytes());
    out.extend_from_slice(keypair.sign(digest).as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::blake3_hash;

    #[test]
    fn sign_then_recover_yields_signer() {
        let kp = ArborKeypair::generate();
        let digest = blake3_hash(b"issuance digest");
        let sig = sign_attestation(&kp, &digest);
        assert_eq!(sig.len(), ATTESTATION_SIGNATURE_LENGTH);

        let recovered = Ed25519Recovery.recover(&digest, &sig).unwrap();
        assert_eq!(recovered, kp.address());
    }

    #[test]
    fn wrong_length_rejected_before_verification() {
        let digest = blake3_hash(b"digest");
        let err = Ed25519Recovery.recover(&digest, &[0u8; 64]).unwrap_err();
        assert!(matches!(
            err,
            RecoveryError::MalformedSignature { actual: 64, .. }
        ));
        assert!(Ed25519Recovery.recover(&digest, &[0u8; 97]).is_err());
        assert!(Ed25519Recovery.recover(&digest, &[]).is_err());
    }

    #[test]
    fn wrong_digest_fails_recovery() {
        let kp = ArborKeypair::generate();
        let sig = sign_attestation(&kp, &blake3_hash(b"signed digest"));
        let other = blake3_hash(b"different digest");
        assert!(Ed25519Recovery.recover(&other, &sig).is_err());
    }

    #[test]
    fn substituted_pubkey_component_fails() {
        // Splicing someone else's key onto a valid signature must not
        // recover to the spliced identity.
        let signer = ArborKeypair::generate();
        let victim = ArborKeypair::generate();
        let digest = blake3_hash(b"digest");

        let mut sig = sign_attestation(&signer, &digest);
        sig[..32].copy_from_slice(victim.address().as_bytes());
        assert!(Ed25519Recovery.recover(&digest, &sig).is_err());
    }

    #[test]
    fn tampered_signature_component_fails() {
        let kp = ArborKeypair::generate();
        let digest = blake3_hash(b"digest");
        let mut sig = sign_attestation(&kp, &digest);
        sig[40] ^= 0x01;
        assert!(Ed25519Recovery.recover(&digest, &sig).is_err());
    }
}
