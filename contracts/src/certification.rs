//! # Certifications & Credit Ids
//!
//! A [`Certification`] is the immutable, caller-supplied description of
//! the real-world activity a credit stands for. It never changes after
//! issuance — the credit id is derived from it, so mutating it would
//! orphan the credit.
//!
//! ## Canonical encoding
//!
//! The credit id is `H(H(canonical(certification)) || salt)`, and the
//! canonical encoding is therefore consensus-critical: any ambiguity would
//! let an attacker craft two certifications with the same id, or predict
//! and squat ids. The encoding is fixed as:
//!
//! ```text
//! len(project): u32 BE  || project bytes
//! len(issuer): u32 BE   || issuer bytes
//! len(location): u32 BE || location bytes
//! len(methodology): u32 BE || methodology bytes
//! quantity: u64 BE
//! vintage: u16 BE
//! expiry: u64 BE
//! standard tag: u8
//! ```
//!
//! Strings are length-prefixed so `("ab", "c")` and `("a", "bc")` cannot
//! collide; integers are fixed-width big-endian; the standard is a single
//! tag byte. Change any of this and every existing credit id breaks.

use serde::{Deserialize, Serialize};
use std::fmt;

use arbor_protocol::crypto::{blake3_hash, blake3_hash_multi};
use arbor_protocol::ledger::AssetId;

/// A caller-chosen 32-byte disambiguator. Two otherwise-identical
/// certifications with different salts yield different credit ids.
pub type Salt = [u8; 32];

/// The certification programme a credit was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Standard {
    /// Verified Carbon Standard.
    Vcs,
    /// Gold Standard for the Global Goals.
    GoldStandard,
    /// Clean Development Mechanism.
    Cdm,
    /// Climate Action Reserve.
    Car,
    /// American Carbon Registry.
    Acr,
    /// Plan Vivo.
    PlanVivo,
}

impl Standard {
    /// The canonical-encoding tag byte. Part of the wire format — the
    /// values are frozen.
    pub fn tag(&self) -> u8 {
        match self {
            Standard::Vcs => 0,
            Standard::GoldStandard => 1,
            Standard::Cdm => 2,
            Standard::Car => 3,
            Standard::Acr => 4,
            Standard::PlanVivo => 5,
        }
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Standard::Vcs => write!(f, "VCS"),
            Standard::GoldStandard => write!(f, "GoldStandard"),
            Standard::Cdm => write!(f, "CDM"),
            Standard::Car => write!(f, "CAR"),
            Standard::Acr => write!(f, "ACR"),
            Standard::PlanVivo => write!(f, "PlanVivo"),
        }
    }
}

/// The immutable description backing a credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    /// Name of the underlying project (e.g. "Rimba Raya REDD+").
    pub project: String,
    /// The issuing body's name.
    pub issuer: String,
    /// Where the activity took place.
    pub location: String,
    /// Methodology identifier (e.g. "VM0007").
    pub methodology: String,
    /// Quantity covered, in the certification's native unit.
    pub quantity: u64,
    /// Vintage year of the underlying activity.
    pub vintage: u16,
    /// Unix timestamp after which the credit is no longer usable.
    /// `0` means the credit never expires.
    pub expiry: u64,
    /// The certification programme.
    pub standard: Standard,
}

impl Certification {
    /// The canonical, unambiguous byte encoding documented in the module
    /// header. Field order and widths are frozen.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        let strings = [
            &self.project,
            &self.issuer,
            &self.location,
            &self.methodology,
        ];
        let mut out = Vec::with_capacity(
            strings.iter().map(|s| 4 + s.len()).sum::<usize>() + 8 + 2 + 8 + 1,
        );
        for s in strings {
            out.extend_from_slice(&(s.len() as u32).to_be_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        out.extend_from_slice(&self.quantity.to_be_bytes());
        out.extend_from_slice(&self.vintage.to_be_bytes());
        out.extend_from_slice(&self.expiry.to_be_bytes());
        out.push(self.standard.tag());
        out
    }
}

/// Derive the deterministic credit id for a `(certification, salt)` pair:
/// `H(H(canonical(certification)) || salt)`.
///
/// Pure — clients use this to predict the id before submitting an
/// issuance request, and the registrar uses the same function to detect
/// duplicates. The id doubles as the asset ledger's token id.
pub fn credit_id(certification: &Certification, salt: &Salt) -> AssetId {
    let inner = blake3_hash(&certification.canonical_bytes());
    AssetId(blake3_hash_multi(&[&inner, salt]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Certification {
        Certification {
            project: "Rimba Raya REDD+".into(),
            issuer: "Arbor Registry".into(),
            location: "Central Kalimantan, ID".into(),
            methodology: "VM0007".into(),
            quantity: 1_000,
            vintage: 2024,
            expiry: 0,
            standard: Standard::Vcs,
        }
    }

    #[test]
    fn credit_id_deterministic() {
        let salt = [7u8; 32];
        assert_eq!(credit_id(&sample(), &salt), credit_id(&sample(), &salt));
    }

    #[test]
    fn salt_disambiguates_identical_certifications() {
        let a = credit_id(&sample(), &[1u8; 32]);
        let b = credit_id(&sample(), &[2u8; 32]);
        assert_ne!(a, b);
    }

    #[test]
    fn any_field_change_changes_id() {
        let salt = [0u8; 32];
        let base = credit_id(&sample(), &salt);

        let mut c = sample();
        c.quantity += 1;
        assert_ne!(credit_id(&c, &salt), base);

        let mut c = sample();
        c.vintage = 2025;
        assert_ne!(credit_id(&c, &salt), base);

        let mut c = sample();
        c.standard = Standard::GoldStandard;
        assert_ne!(credit_id(&c, &salt), base);

        let mut c = sample();
        c.expiry = 1;
        assert_ne!(credit_id(&c, &salt), base);
    }

    #[test]
    fn string_boundaries_are_unambiguous() {
        // Length prefixes must keep adjacent strings from bleeding into
        // each other.
        let mut a = sample();
        a.project = "ab".into();
        a.issuer = "c".into();

        let mut b = sample();
        b.project = "a".into();
        b.issuer = "bc".into();

        assert_ne!(a.canonical_bytes(), b.canonical_bytes());
        assert_ne!(credit_id(&a, &[0u8; 32]), credit_id(&b, &[0u8; 32]));
    }

    #[test]
    fn standard_tags_are_stable_and_distinct() {
        let all = [
            Standard::Vcs,
            Standard::GoldStandard,
            Standard::Cdm,
            Standard::Car,
            Standard::Acr,
            Standard::PlanVivo,
        ];
        for (i, s) in all.iter().enumerate() {
            assert_eq!(s.tag() as usize, i);
        }
    }

    #[test]
    fn certification_serde_roundtrip() {
        let c = sample();
        let json = serde_json::to_string(&c).unwrap();
        let back: Certification = serde_json::from_str(&json).unwrap();
        assert_eq!(c, back);
    }
}
