//! # Cryptographic Primitives
//!
//! Everything security-related in the protocol flows through here. We
//! deliberately chose boring, well-audited cryptography:
//!
//! - **Ed25519** for signatures — fast, deterministic, and nobody has
//!   broken it.
//! - **BLAKE3** for hashing — because we live in the future, and its
//!   `derive_key` mode gives us principled domain separation.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. This module is thin, type-safe plumbing over audited
//! implementations. Any urge to hand-tune these functions should be
//! redirected toward the literature on timing side channels, which cures
//! it quickly.

pub mod attestation;
pub mod hash;
pub mod keys;

// Flat re-exports of the names callers actually want, so using a keypair
// doesn't require knowing which submodule it sleeps in.
pub use attestation::{sign_attestation, Ed25519Recovery, RecoveryError, SignerRecovery};
pub use hash::{blake3_hash, blake3_hash_multi, domain_separated_hash, domain_separated_hash_multi};
pub use keys::{Address, ArborKeypair, ArborPublicKey, ArborSignature, KeyError};
