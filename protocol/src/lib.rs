//! # Arbor Protocol — Core Primitives
//!
//! The foundation layer for Arbor: content-addressed, attestation-gated
//! certificate credits and the collaborators those credits live on.
//!
//! This crate deliberately contains no business rules. The registrar and
//! marketplace state machines live in `arbor-contracts`; what belongs here
//! is everything they share and everything they treat as external:
//!
//! - **crypto** — BLAKE3 hashing with domain separation, Ed25519 keys and
//!   identities, and the pluggable signer-recovery capability attestation
//!   checks are built on. Don't roll your own.
//! - **ledger** — the asset-ledger collaborator contract: ownership,
//!   approvals, mint/burn/transfer with receiver acknowledgment, plus the
//!   in-memory implementation used in tests.
//! - **payment** — the external payment endpoint used for fulfillment
//!   refunds, plus an in-memory balance book.
//! - **time** — the clock seam; expiry logic is only testable with a
//!   clock that can be told to move.
//! - **config** — protocol constants and the published domain-separation
//!   context strings.
//!
//! ## Design Philosophy
//!
//! 1. Correct first; fast is allowed to come second (it rarely has to).
//! 2. Zero unsafe anywhere near key material.
//! 3. If it touches money or an identity, it has tests. Plural.

pub mod config;
pub mod crypto;
pub mod ledger;
pub mod payment;
pub mod time;
