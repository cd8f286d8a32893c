//! # Keys & Identities
//!
//! Ed25519 keypairs and the [`Address`] identity type.
//!
//! Every party in the system — contract owner, validator, credit holder,
//! marketplace — is identified by the 32 bytes of an Ed25519 public key.
//! There is no separate address derivation step: the key *is* the address.
//! That keeps attestation recovery trivial (recovering a signer yields the
//! identity directly) at the cost of a slightly longer identity than a
//! truncated-hash scheme would give.
//!
//! ## Security considerations
//!
//! - Key generation uses the OS RNG (`OsRng`). If your OS RNG is broken,
//!   you have bigger problems than Arbor.
//! - Key bytes are never logged, and `Debug` on a keypair prints only the
//!   public half.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur during key operations.
///
/// Intentionally vague about *why* something failed — leaking details about
/// key material through error messages is a classic footgun.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid public key bytes: not a valid Ed25519 point")]
    InvalidPublicKey,
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 32-byte account identity: the raw bytes of an Ed25519 public key.
///
/// [`Address::ZERO`] is the reserved null identity. It is not a valid
/// curve point, so nothing can ever sign for it; the contracts use it as
/// the "no recipient" / "nobody" sentinel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// The null identity. Rejected wherever a real party is required.
    pub const ZERO: Address = Address([0u8; 32]);

    /// True if this is the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// The raw identity bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded representation, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Base58-encoded representation — what users see as their address.
    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    /// Parse a hex-encoded address.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Address(arr))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// ArborKeypair
// ---------------------------------------------------------------------------

/// An identity keypair wrapping an Ed25519 signing key.
///
/// Intentionally does NOT implement `Serialize`/`Deserialize` — serializing
/// private keys should be a deliberate act, not something that happens
/// because a keypair ended up inside a JSON response.
///
/// # Examples
///
/// ```
/// use arbor_protocol::crypto::ArborKeypair;
///
/// let kp = ArborKeypair::generate();
/// let sig = kp.sign(b"retire credit 0xabc...");
/// assert!(kp.public_key().verify(b"retire credit 0xabc...", &sig));
/// ```
pub struct ArborKeypair {
    signing_key: SigningKey,
}

impl ArborKeypair {
    /// Generate a fresh keypair using the OS cryptographic RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Construct a keypair deterministically from a 32-byte seed.
    ///
    /// **Warning**: a weak seed gives a weak key. Use a proper CSPRNG or
    /// KDF to produce the seed bytes; this exists for derivation and tests.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this keypair.
    pub fn public_key(&self) -> ArborPublicKey {
        ArborPublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// The on-ledger identity of this keypair.
    pub fn address(&self) -> Address {
        Address(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message. Ed25519 signatures are deterministic — same key,
    /// same message, same signature, no nonce games.
    pub fn sign(&self, message: &[u8]) -> ArborSignature {
        ArborSignature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }
}

impl fmt::Debug for ArborKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print secret key material. Not even "partially."
        write!(f, "ArborKeypair(pub={})", self.public_key().to_hex())
    }
}

// ---------------------------------------------------------------------------
// ArborPublicKey
// ---------------------------------------------------------------------------

/// The public half of an identity, safe to share with the world.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArborPublicKey {
    bytes: [u8; 32],
}

impl ArborPublicKey {
    /// Try to build a public key from a byte slice, validating that the
    /// bytes are a real Ed25519 point. We don't accept arbitrary 32 bytes —
    /// low-order points and other degenerate cases are rejected here.
    pub fn try_from_slice(slice: &[u8]) -> Result<Self, KeyError> {
        let bytes: [u8; 32] = slice.try_into().map_err(|_| KeyError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&bytes).map_err(|_| KeyError::InvalidPublicKey)?;
        Ok(Self { bytes })
    }

    /// The raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// This key as an on-ledger identity.
    pub fn address(&self) -> Address {
        Address(self.bytes)
    }

    /// Verify a signature against this public key.
    ///
    /// Boolean rather than `Result` — callers want a yes/no answer, and an
    /// error oracle describing *why* verification failed helps nobody we
    /// want to help.
    pub fn verify(&self, message: &[u8], signature: &ArborSignature) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.bytes) else {
            return false;
        };
        let sig = DalekSignature::from_bytes(&signature.bytes);
        verifying_key.verify(message, &sig).is_ok()
    }

    /// Hex-encoded representation, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for ArborPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArborPublicKey({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// ArborSignature
// ---------------------------------------------------------------------------

/// A raw Ed25519 signature over a message: `R || s`, 64 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArborSignature {
    #[serde(with = "serde_bytes_64")]
    bytes: [u8; 64],
}

impl ArborSignature {
    /// Wrap a raw 64-byte signature.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    /// The raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Hex-encoded signature, 128 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for ArborSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "ArborSignature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}

/// Serde helper for `[u8; 64]` — serde's derive stops at 32-element arrays.
mod serde_bytes_64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 64], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(de)?;
        let vec = hex::decode(&s).map_err(D::Error::custom)?;
        vec.as_slice()
            .try_into()
            .map_err(|_| D::Error::custom("expected 64 bytes"))
    }
}
