//! # Registrar
//!
//! The registrar owns the trust side of the system: which validators may
//! authorize issuance, which attestation digests have already been spent,
//! and the full metadata lifecycle of every credit from issuance to
//! retirement. It mints and burns through the asset ledger but never
//! touches ownership records directly.
//!
//! ## Issuance authorization
//!
//! An issuance request carries an attestation signature from a validator.
//! What gets signed is a two-layer domain-separated digest:
//!
//! ```text
//! inner = H_issuance( credit_id || attestation_proof )
//! outer = H_protocol( registrar_address || network_id || inner )
//! ```
//!
//! The inner layer binds the signature to one specific credit and proof;
//! the outer layer binds it to one registrar instance on one network. A
//! validator's signature for a devnet registrar authorizes nothing on
//! mainnet, and nothing on any other registrar deployment.
//!
//! Each accepted digest is recorded as consumed *before* the mint call
//! runs, because minting can execute a recipient's receive hook — the
//! replay window must already be closed when foreign code gets control.
//!
//! ## Retirement
//!
//! Retirement is the one-way consumption of a credit as proof of offset:
//! the asset is burned, but the metadata survives with the retirement
//! time and retirer recorded, so the claim stays auditable forever.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use arbor_protocol::config::{ISSUANCE_CONTEXT, PROTOCOL_CONTEXT};
use arbor_protocol::crypto::{domain_separated_hash_multi, Address, SignerRecovery};
use arbor_protocol::ledger::{AssetId, AssetLedger, LedgerError};
use arbor_protocol::time::{Clock, SystemClock};

use crate::certification::{credit_id, Certification, Salt};
use crate::guard::{ReentrancyGuard, ReentrantCall};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registrar operations.
#[derive(Debug, Error)]
pub enum RegistrarError {
    /// The caller is not the registrar owner.
    #[error("unauthorized: caller is not the registrar owner")]
    Unauthorized,

    /// The zero address cannot be enrolled as a validator.
    #[error("the zero address cannot be a validator")]
    ZeroIdentity,

    /// A credit already exists for this `(certification, salt)` pair.
    #[error("credit already issued: {0}")]
    AlreadyIssued(AssetId),

    /// The attestation signature is malformed, unrecoverable, or from an
    /// identity that is not an enabled validator.
    #[error("invalid attestation signature")]
    InvalidSignature,

    /// This attestation digest has already authorized an issuance.
    #[error("attestation digest already consumed")]
    SignatureReplayed,

    /// The credit is not issued, already expired, or already retired.
    #[error("credit is not usable: {0}")]
    UnusableCredit(AssetId),

    /// The caller is neither the owner, the approved delegate, nor an
    /// approved operator for the credit's asset.
    #[error("caller {caller} may not retire credit {id}")]
    UnauthorizedRetire {
        /// The credit in question.
        id: AssetId,
        /// Who tried to retire it.
        caller: Address,
    },

    /// A guarded entry point was re-entered while an operation was in
    /// flight.
    #[error("reentrant call rejected")]
    Reentrant,

    /// The asset ledger refused an operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<ReentrantCall> for RegistrarError {
    fn from(_: ReentrantCall) -> Self {
        RegistrarError::Reentrant
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything the registrar remembers about a credit.
///
/// Created once at issuance; the only mutation ever applied is the
/// terminal retirement write. Never deleted — retired credits remain
/// queryable as proof of offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditRecord {
    /// The immutable certification backing the credit.
    pub certification: Certification,
    /// The disambiguating salt used in id derivation.
    pub salt: Salt,
    /// Unix timestamp of issuance.
    pub created_at: u64,
    /// Who submitted the issuance request.
    pub minter: Address,
    /// The validator whose attestation authorized issuance.
    pub attester: Address,
    /// The opaque attestation proof blob bound into the signed digest.
    pub attestation: Vec<u8>,
    /// Unix timestamp of retirement, `0` while the credit is live.
    pub retired_at: u64,
    /// Who retired the credit, unset until retirement.
    pub retired_by: Option<Address>,
}

/// Notifications emitted by registrar state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrarEvent {
    /// A validator was enabled.
    ValidatorAdded {
        /// The enrolled identity.
        validator: Address,
    },
    /// A validator was disabled.
    ValidatorRemoved {
        /// The removed identity.
        validator: Address,
    },
    /// A credit was issued.
    Issued {
        /// The new credit id.
        id: AssetId,
        /// Who received the minted asset.
        recipient: Address,
        /// The attesting validator.
        attester: Address,
    },
    /// A credit was retired.
    Retired {
        /// The retired credit.
        id: AssetId,
        /// Who retired it.
        retirer: Address,
    },
}

// ---------------------------------------------------------------------------
// Digest derivation
// ---------------------------------------------------------------------------

/// The two-layer attestation digest for an issuance request.
///
/// Pure and published: off-chain validators run exactly this to construct
/// the digest they sign, using [`ISSUANCE_CONTEXT`] and
/// [`PROTOCOL_CONTEXT`] from the protocol config.
pub fn issuance_digest(
    registrar: Address,
    network_id: u32,
    id: AssetId,
    attestation_proof: &[u8],
) -> [u8; 32] {
    let inner =
        domain_separated_hash_multi(ISSUANCE_CONTEXT, &[id.as_bytes(), attestation_proof]);
    domain_separated_hash_multi(
        PROTOCOL_CONTEXT,
        &[
            registrar.as_bytes(),
            &network_id.to_be_bytes(),
            &inner,
        ],
    )
}

// ---------------------------------------------------------------------------
// Registrar
// ---------------------------------------------------------------------------

/// The issue/retire state machine and its trust state.
pub struct Registrar {
    /// The administrative owner — the only identity that may toggle
    /// validators.
    owner: Address,
    /// This instance's own identity, bound into every attestation digest.
    address: Address,
    /// The pluggable signer-recovery capability.
    recovery: Box<dyn SignerRecovery>,
    /// Time source for creation and retirement stamps.
    clock: Arc<dyn Clock>,
    /// Enabled validators.
    validators: HashSet<Address>,
    /// Attestation digests that have already authorized an issuance.
    /// Append-only for the instance's lifetime.
    consumed: HashSet<[u8; 32]>,
    /// Credit metadata keyed by credit id.
    credits: HashMap<AssetId, CreditRecord>,
    /// Per-instance mutual exclusion for state-changing entry points.
    guard: ReentrancyGuard,
    /// Pending event records, drained by [`take_events`](Self::take_events).
    events: Vec<RegistrarEvent>,
}

impl Registrar {
    /// Create a registrar with the production signature scheme and the
    /// system clock.
    pub fn new(owner: Address, address: Address) -> Self {
        Self::with_parts(
            owner,
            address,
            Box::new(arbor_protocol::crypto::Ed25519Recovery),
            Arc::new(SystemClock),
        )
    }

    /// Create a registrar with explicit recovery and clock capabilities.
    pub fn with_parts(
        owner: Address,
        address: Address,
        recovery: Box<dyn SignerRecovery>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            owner,
            address,
            recovery,
            clock,
            validators: HashSet::new(),
            consumed: HashSet::new(),
            credits: HashMap::new(),
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
        }
    }

    /// This registrar's identity.
    pub fn address(&self) -> Address {
        self.address
    }

    // -----------------------------------------------------------------------
    // Validator administration
    // -----------------------------------------------------------------------

    /// Enable a validator. Owner-only; enabling an already-enabled
    /// validator is a silent no-op (no event).
    pub fn add_validator(
        &mut self,
        caller: Address,
        validator: Address,
    ) -> Result<(), RegistrarError> {
        let _permit = self.guard.enter()?;
        if caller != self.owner {
            return Err(RegistrarError::Unauthorized);
        }
        if validator.is_zero() {
            return Err(RegistrarError::ZeroIdentity);
        }
        if self.validators.insert(validator) {
            debug!(validator = %validator, "validator enabled");
            self.events.push(RegistrarEvent::ValidatorAdded { validator });
        }
        Ok(())
    }

    /// Disable a validator. Owner-only; disabling an absent validator is a
    /// silent no-op (no event).
    pub fn remove_validator(
        &mut self,
        caller: Address,
        validator: Address,
    ) -> Result<(), RegistrarError> {
        let _permit = self.guard.enter()?;
        if caller != self.owner {
            return Err(RegistrarError::Unauthorized);
        }
        if self.validators.remove(&validator) {
            debug!(validator = %validator, "validator disabled");
            self.events
                .push(RegistrarEvent::ValidatorRemoved { validator });
        }
        Ok(())
    }

    /// Whether `identity` is currently an enabled validator.
    pub fn is_validator(&self, identity: Address) -> bool {
        self.validators.contains(&identity)
    }

    // -----------------------------------------------------------------------
    // Issue
    // -----------------------------------------------------------------------

    /// Issue a credit.
    ///
    /// Verifies the attestation signature against the two-layer digest,
    /// enforces replay protection, persists the metadata, and mints the
    /// asset to `recipient` — or to the caller when `recipient` is the
    /// zero address. Returns the new credit id.
    ///
    /// # Errors
    ///
    /// [`RegistrarError::AlreadyIssued`] if the `(certification, salt)`
    /// pair has been issued before;
    /// [`RegistrarError::InvalidSignature`] if the signature is not the
    /// fixed 96-byte encoding, does not recover, or recovers to a
    /// non-validator; [`RegistrarError::SignatureReplayed`] if the digest
    /// was consumed by an earlier issuance. A ledger failure unwinds the
    /// whole operation.
    #[allow(clippy::too_many_arguments)]
    pub fn issue(
        &mut self,
        ledger: &mut dyn AssetLedger,
        caller: Address,
        certification: Certification,
        recipient: Address,
        salt: Salt,
        attestation_proof: Vec<u8>,
        signature: &[u8],
    ) -> Result<AssetId, RegistrarError> {
        let _permit = self.guard.enter()?;

        let id = credit_id(&certification, &salt);
        if self.credits.contains_key(&id) {
            return Err(RegistrarError::AlreadyIssued(id));
        }

        let digest = issuance_digest(self.address, ledger.network_id(), id, &attestation_proof);
        let attester = self
            .recovery
            .recover(&digest, signature)
            .map_err(|_| RegistrarError::InvalidSignature)?;
        if !self.validators.contains(&attester) {
            return Err(RegistrarError::InvalidSignature);
        }
        if self.consumed.contains(&digest) {
            return Err(RegistrarError::SignatureReplayed);
        }
        // Consume the digest before minting: the mint can run a recipient
        // receive hook, and the replay window must be closed by then.
        self.consumed.insert(digest);

        let owner = if recipient.is_zero() { caller } else { recipient };
        self.credits.insert(
            id,
            CreditRecord {
                certification,
                salt,
                created_at: self.clock.now(),
                minter: caller,
                attester,
                attestation: attestation_proof,
                retired_at: 0,
                retired_by: None,
            },
        );

        if let Err(err) = ledger.mint(owner, id) {
            // Full unwind: a failed issuance leaves no trace, including
            // the consumed digest.
            self.credits.remove(&id);
            self.consumed.remove(&digest);
            return Err(err.into());
        }

        info!(id = %id, recipient = %owner, attester = %attester, "credit issued");
        self.events.push(RegistrarEvent::Issued {
            id,
            recipient: owner,
            attester,
        });
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Retire
    // -----------------------------------------------------------------------

    /// Retire a credit: burn the asset and record the terminal retirement
    /// metadata. Returns the stored certification — a durable proof of
    /// offset that outlives the asset itself.
    ///
    /// # Errors
    ///
    /// [`RegistrarError::UnusableCredit`] unless the credit is issued,
    /// unexpired, and unretired; [`RegistrarError::UnauthorizedRetire`]
    /// unless the caller is the asset's owner, its approved delegate, or
    /// an approved operator for the owner.
    pub fn retire(
        &mut self,
        ledger: &mut dyn AssetLedger,
        caller: Address,
        id: AssetId,
    ) -> Result<Certification, RegistrarError> {
        let _permit = self.guard.enter()?;

        if !self.usable(id) {
            return Err(RegistrarError::UnusableCredit(id));
        }

        let owner = ledger.owner_of(id)?;
        let authorized = caller == owner
            || ledger.get_approved(id) == Some(caller)
            || ledger.is_approved_for_all(owner, caller);
        if !authorized {
            return Err(RegistrarError::UnauthorizedRetire { id, caller });
        }

        let now = self.clock.now();
        // Usability was checked above, so the record exists.
        let record = self
            .credits
            .get_mut(&id)
            .ok_or(RegistrarError::UnusableCredit(id))?;
        record.retired_at = now;
        record.retired_by = Some(caller);
        let certification = record.certification.clone();

        if let Err(err) = ledger.burn(id) {
            if let Some(record) = self.credits.get_mut(&id) {
                record.retired_at = 0;
                record.retired_by = None;
            }
            return Err(err.into());
        }

        info!(id = %id, retirer = %caller, "credit retired");
        self.events.push(RegistrarEvent::Retired { id, retirer: caller });
        Ok(certification)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Whether a credit exists at `id`.
    pub fn is_credit_issued(&self, id: AssetId) -> bool {
        self.credits.contains_key(&id)
    }

    /// Whether the credit has passed its expiry. Credits with `expiry = 0`
    /// never expire; the bound is inclusive (`expiry <= now` is expired).
    pub fn is_credit_expired(&self, id: AssetId) -> bool {
        self.credits.get(&id).is_some_and(|r| {
            r.certification.expiry != 0 && r.certification.expiry <= self.clock.now()
        })
    }

    /// Whether the credit has been retired.
    pub fn is_credit_retired(&self, id: AssetId) -> bool {
        self.credits.get(&id).is_some_and(|r| r.retired_at > 0)
    }

    /// issued ∧ ¬expired ∧ ¬retired.
    pub fn is_usable_credit(&self, id: AssetId) -> bool {
        self.usable(id)
    }

    /// Full metadata for a credit, if issued.
    pub fn get_metadata(&self, id: AssetId) -> Option<&CreditRecord> {
        self.credits.get(&id)
    }

    /// Just the certification for a credit, if issued.
    pub fn get_certification(&self, id: AssetId) -> Option<&Certification> {
        self.credits.get(&id).map(|r| &r.certification)
    }

    /// Drain and return the pending event records.
    pub fn take_events(&mut self) -> Vec<RegistrarEvent> {
        std::mem::take(&mut self.events)
    }

    fn usable(&self, id: AssetId) -> bool {
        self.is_credit_issued(id) && !self.is_credit_expired(id) && !self.is_credit_retired(id)
    }
}
