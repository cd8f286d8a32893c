//! # Hashing Utilities
//!
//! BLAKE3, and only BLAKE3. Credit ids, listing ids, and attestation
//! digests are all content-addressed with the same 32-byte hash, and we
//! refuse to support a second hash function without a very good reason.
//!
//! ## Why BLAKE3
//!
//! Fast on every platform, parallelizable, 128-bit collision resistance
//! at 256-bit output, and — the part we actually lean on — a built-in
//! `derive_key` mode for domain separation. Everything content-addressed
//! in Arbor is security-sensitive: if two distinct certifications could
//! produce the same credit id, an attacker could front-run issuance or
//! replay attestations. So the encoding rules live next to the hash calls
//! and both are treated as consensus-critical.
//!
//! ## Domain separation
//!
//! `domain_separated_hash("ctx-a", data)` and
//! `domain_separated_hash("ctx-b", data)` can never collide, because the
//! context string selects a different internal IV. Don't prepend tags
//! manually — that's what amateurs do.

/// Compute the BLAKE3 hash of the input data.
///
/// Returns a 32-byte digest as a fixed-size array. This is the workhorse
/// hash of the protocol — anything that needs a plain content hash goes
/// through here.
///
/// # Example
///
/// ```
/// use arbor_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"arbor protocol");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple byte slices together without concatenation overhead.
///
/// Instead of allocating a buffer to concatenate inputs, we feed them
/// sequentially into the hasher. Same result, less allocation. Used for
/// composite structures like `(asset || price || expiry || salt)`.
///
/// Note that this is equivalent to hashing the concatenation — callers are
/// responsible for making the part boundaries unambiguous (fixed widths or
/// length prefixes), since `["ab", "c"]` and `["a", "bc"]` hash identically.
pub fn blake3_hash_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Compute a domain-separated hash using BLAKE3's `derive_key` mode.
///
/// The context string selects a distinct internal IV, so the same data
/// hashed under two contexts can never collide. This is what keeps an
/// attestation digest from ever being mistaken for a credit id, and an
/// issuance signature from verifying under any other protocol context.
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Domain-separated hash over multiple parts. The multi-part analogue of
/// [`domain_separated_hash`]; the same boundary caveat as
/// [`blake3_hash_multi`] applies.
pub fn domain_separated_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
