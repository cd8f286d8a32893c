//! # Protocol Configuration & Constants
//!
//! Every magic number in Arbor lives here. A constant hardcoded anywhere
//! else is a bug report waiting to happen — move it here first.
//!
//! Two of these strings are load-bearing far beyond this crate: the
//! domain-separation contexts ([`ISSUANCE_CONTEXT`] and
//! [`PROTOCOL_CONTEXT`]) are part of the attestation wire format. Any
//! off-chain validator constructing a digest to sign must use the exact
//! same bytes, so changing them after launch invalidates every outstanding
//! attestation.

// ---------------------------------------------------------------------------
// Network Identifiers
// ---------------------------------------------------------------------------

/// Mainnet — the one that counts. Credits issued here back real-world
/// claims.
pub const NETWORK_ID_MAINNET: u32 = 0x41524252; // "ARBR" in ASCII hex

/// Testnet — mainnet rules, play money. Break it loudly, that's the job.
pub const NETWORK_ID_TESTNET: u32 = 0x41524254; // "ARBT"

/// Devnet — scorched earth. Wiped whenever someone needs a clean slate,
/// so point nothing you care about at it.
pub const NETWORK_ID_DEVNET: u32 = 0x41524244; // "ARBD"

// ---------------------------------------------------------------------------
// Domain Separation Contexts
// ---------------------------------------------------------------------------

/// Context string for the inner attestation digest binding a credit id to
/// its attestation proof. Published so off-chain validators can construct
/// the digest they are asked to sign.
pub const ISSUANCE_CONTEXT: &str = "arbor-issuance-v1";

/// Context string for the outer digest layer, which additionally binds the
/// registrar instance and the ledger's network id. A signature produced for
/// one registrar on one network verifies nowhere else.
pub const PROTOCOL_CONTEXT: &str = "arbor-protocol-v1";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Ed25519 — deterministic signatures, 128-bit security, no k-value
/// footguns. The only sane choice in 2026.
pub const SIGNING_ALGORITHM: &str = "Ed25519";

/// Public (verifying) key length in bytes. Doubles as the address length.
pub const VERIFYING_KEY_LENGTH: usize = 32;

/// Raw Ed25519 signature length (R || s). Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Attestation signature wire length: three fixed-width 32-byte components,
/// `pubkey || R || s`. Anything that isn't exactly 96 bytes is rejected
/// before any curve arithmetic happens.
pub const ATTESTATION_SIGNATURE_LENGTH: usize = 96;

/// The hash function for credit ids, listing ids, and attestation digests.
/// BLAKE3 everywhere — it's the fastest proper cryptographic hash on every
/// platform that matters, and `derive_key` gives us domain separation for
/// free.
pub const PRIMARY_HASH_FUNCTION: &str = "BLAKE3";

/// Hash output length in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Ledger Parameters
// ---------------------------------------------------------------------------

/// The acknowledgment value a programmable account must return from its
/// receive hook for an asset transfer to complete. "RCVD".
pub const RECEIVER_ACK: [u8; 4] = [0x52, 0x43, 0x56, 0x44];
