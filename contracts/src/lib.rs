//! # Arbor Contracts
//!
//! The trust-and-exchange core for certification-backed credits:
//!
//! - **Registrar** — validator-attested issuance and one-way retirement
//!   of credits, with two-layer domain-separated attestation digests and
//!   replay protection.
//! - **Marketplace** — peer-to-peer escrowed trading of the resulting
//!   assets, with deterministic listing ids and atomic payment
//!   settlement.
//!
//! Both operate on the asset ledger strictly through the
//! `arbor_protocol::ledger::AssetLedger` collaborator trait; neither calls
//! the other.
//!
//! ## Design Principles
//!
//! 1. State transitions are explicit: enum variants, not boolean flags or
//!    sentinel numbers.
//! 2. Signature verification gates every issuance; ownership or approval
//!    gates everything else.
//! 3. Every state-changing entry point is reentrancy-guarded, and state
//!    that closes a replay or double-settlement window is written before
//!    any external call runs.
//! 4. Failures unwind completely — no operation leaves a partial write
//!    behind.
//! 5. Every public type is serializable (serde) for wire transport and
//!    persistent storage.

pub mod certification;
pub mod guard;
pub mod marketplace;
pub mod registrar;
