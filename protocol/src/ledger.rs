//! # Asset Ledger
//!
//! The ledger owns identity, ownership, and transfer of individual credit
//! tokens. The registrar and marketplace never touch ownership state
//! directly — everything flows through the [`AssetLedger`] trait, which
//! pins down the exact operation set they are allowed to rely on.
//!
//! ## Receiver acknowledgment
//!
//! When an asset is minted or transferred to a programmable account, the
//! ledger invokes the account's [`AssetReceiver`] hook and requires it to
//! return [`RECEIVER_ACK`]. Anything else aborts the transfer. This is the
//! seam through which an external party can run code *in the middle of* a
//! registrar or marketplace operation — the reason those components carry
//! reentrancy guards and write their window-closing state before calling
//! into the ledger.
//!
//! ## MemoryLedger
//!
//! [`MemoryLedger`] is the in-process implementation used by tests and
//! local deployments: flat maps, a monotonically advancing position
//! counter, and a registry of receiver hooks. Privileged mint/burn gating
//! is a deployment concern — in a real deployment only the registrar holds
//! a handle that reaches `mint`/`burn`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;
use tracing::trace;

use crate::config::RECEIVER_ACK;
use crate::crypto::keys::Address;

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A 32-byte token identifier.
///
/// For credits this is the content-addressed credit id — the same value
/// keys the registrar's metadata store and the ledger's ownership record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub [u8; 32]);

impl AssetId {
    /// The raw identifier bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded representation, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", &self.to_hex()[..16])
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The referenced asset has never been minted (or has been burned).
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),

    /// Minting an id that already exists.
    #[error("asset already minted: {0}")]
    AlreadyMinted(AssetId),

    /// A transfer named a `from` that does not own the asset.
    #[error("transfer from {claimed} but asset {id} is owned by {owner}")]
    NotOwner {
        /// The asset in question.
        id: AssetId,
        /// Who the caller claimed owns it.
        claimed: Address,
        /// Who actually owns it.
        owner: Address,
    },

    /// The recipient's receive hook returned something other than the
    /// expected acknowledgment value.
    #[error("receiver rejected asset {0}")]
    ReceiverRejected(AssetId),

    /// Minting to the null identity.
    #[error("cannot mint to the zero address")]
    ZeroRecipient,
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// The receive hook of a programmable account.
///
/// Invoked by the ledger whenever an asset lands on the account, before
/// the ownership write is considered final. Must return [`RECEIVER_ACK`]
/// for the operation to complete.
pub trait AssetReceiver {
    /// Called with the sending party (`Address::ZERO` for mints) and the
    /// asset being delivered. The returned value is checked against
    /// [`RECEIVER_ACK`].
    fn on_asset_received(&mut self, from: Address, id: AssetId) -> [u8; 4];
}

/// The fixed operation set the registrar and marketplace consume.
pub trait AssetLedger {
    /// The network this ledger instance belongs to. Bound into attestation
    /// digests so signatures cannot migrate across networks.
    fn network_id(&self) -> u32;

    /// The current ledger position — a value that advances with every
    /// state mutation. Used as a uniqueness input for listing ids.
    fn position(&self) -> u64;

    /// Create `id` owned by `owner`. Privileged; registrar-only in any
    /// real deployment.
    fn mint(&mut self, owner: Address, id: AssetId) -> Result<(), LedgerError>;

    /// Destroy `id` permanently. Privileged; registrar-only.
    fn burn(&mut self, id: AssetId) -> Result<(), LedgerError>;

    /// Current owner of `id`.
    fn owner_of(&self, id: AssetId) -> Result<Address, LedgerError>;

    /// The singly-approved delegate for `id`, if any.
    fn get_approved(&self, id: AssetId) -> Option<Address>;

    /// Whether `operator` is an approved operator for every asset of
    /// `owner`.
    fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool;

    /// Move `id` from `from` to `to`, running the recipient's receive
    /// hook if it has one.
    fn transfer(&mut self, from: Address, to: Address, id: AssetId) -> Result<(), LedgerError>;
}

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

/// In-memory [`AssetLedger`] implementation.
#[derive(Default)]
pub struct MemoryLedger {
    network_id: u32,
    position: u64,
    owners: HashMap<AssetId, Address>,
    approvals: HashMap<AssetId, Address>,
    operators: HashSet<(Address, Address)>,
    receivers: HashMap<Address, Box<dyn AssetReceiver>>,
}

impl MemoryLedger {
    /// Create an empty ledger for the given network.
    pub fn new(network_id: u32) -> Self {
        Self {
            network_id,
            ..Default::default()
        }
    }

    /// Register a programmable account. Subsequent mints and transfers to
    /// `account` will run `receiver` and require the acknowledgment value.
    pub fn register_receiver(&mut self, account: Address, receiver: Box<dyn AssetReceiver>) {
        self.receivers.insert(account, receiver);
    }

    /// Set or clear the singly-approved delegate for an asset.
    pub fn set_approved(&mut self, id: AssetId, delegate: Option<Address>) {
        match delegate {
            Some(addr) => {
                self.approvals.insert(id, addr);
            }
            None => {
                self.approvals.remove(&id);
            }
        }
    }

    /// Enable or disable an operator for all of `owner`'s assets.
    pub fn set_operator(&mut self, owner: Address, operator: Address, enabled: bool) {
        if enabled {
            self.operators.insert((owner, operator));
        } else {
            self.operators.remove(&(owner, operator));
        }
    }

    /// Number of live (minted and not burned) assets.
    pub fn asset_count(&self) -> usize {
        self.owners.len()
    }

    fn acknowledge(&mut self, from: Address, to: Address, id: AssetId) -> Result<(), LedgerError> {
        if let Some(receiver) = self.receivers.get_mut(&to) {
            if receiver.on_asset_received(from, id) != RECEIVER_ACK {
                return Err(LedgerError::ReceiverRejected(id));
            }
        }
        Ok(())
    }
}

impl AssetLedger for MemoryLedger {
    fn network_id(&self) -> u32 {
        self.network_id
    }

    fn position(&self) -> u64 {
        self.position
    }

    fn mint(&mut self, owner: Address, id: AssetId) -> Result<(), LedgerError> {
        if owner.is_zero() {
            return Err(LedgerError::ZeroRecipient);
        }
        if self.owners.contains_key(&id) {
            return Err(LedgerError::AlreadyMinted(id));
        }
        // The hook runs before the ownership write; a rejection leaves the
        // ledger untouched.
        self.acknowledge(Address::ZERO, owner, id)?;
        self.owners.insert(id, owner);
        self.position += 1;
        trace!(id = %id, owner = %owner, position = self.position, "asset minted");
        Ok(())
    }

    fn burn(&mut self, id: AssetId) -> Result<(), LedgerError> {
        self.owners
            .remove(&id)
            .ok_or(LedgerError::UnknownAsset(id))?;
        self.approvals.remove(&id);
        self.position += 1;
        trace!(id = %id, position = self.position, "asset burned");
        Ok(())
    }

    fn owner_of(&self, id: AssetId) -> Result<Address, LedgerError> {
        self.owners
            .get(&id)
            .copied()
            .ok_or(LedgerError::UnknownAsset(id))
    }

    fn get_approved(&self, id: AssetId) -> Option<Address> {
        self.approvals.get(&id).copied()
    }

    fn is_approved_for_all(&self, owner: Address, operator: Address) -> bool {
        self.operators.contains(&(owner, operator))
    }

    fn transfer(&mut self, from: Address, to: Address, id: AssetId) -> Result<(), LedgerError> {
        let owner = self.owner_of(id)?;
        if owner != from {
            return Err(LedgerError::NotOwner {
                id,
                claimed: from,
                owner,
            });
        }
        self.acknowledge(from, to, id)?;
        self.owners.insert(id, to);
        // A transfer invalidates any single-asset approval the previous
        // owner granted.
        self.approvals.remove(&id);
        self.position += 1;
        trace!(id = %id, from = %from, to = %to, position = self.position, "asset transferred");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ArborKeypair;

    fn addr() -> Address {
        ArborKeypair::generate().address()
    }

    fn asset(n: u8) -> AssetId {
        AssetId([n; 32])
    }

    /// Receiver that records deliveries and answers with a fixed value.
    struct ScriptedReceiver {
        ack: [u8; 4],
        received: Vec<(Address, AssetId)>,
    }

    impl AssetReceiver for ScriptedReceiver {
        fn on_asset_received(&mut self, from: Address, id: AssetId) -> [u8; 4] {
            self.received.push((from, id));
            self.ack
        }
    }

    #[test]
    fn mint_assigns_ownership_and_advances_position() {
        let mut ledger = MemoryLedger::new(7);
        let alice = addr();
        assert_eq!(ledger.position(), 0);
        ledger.mint(alice, asset(1)).unwrap();
        assert_eq!(ledger.owner_of(asset(1)).unwrap(), alice);
        assert_eq!(ledger.position(), 1);
        assert_eq!(ledger.network_id(), 7);
    }

    #[test]
    fn double_mint_rejected() {
        let mut ledger = MemoryLedger::new(7);
        let alice = addr();
        ledger.mint(alice, asset(1)).unwrap();
        assert!(matches!(
            ledger.mint(alice, asset(1)),
            Err(LedgerError::AlreadyMinted(_))
        ));
    }

    #[test]
    fn mint_to_zero_rejected() {
        let mut ledger = MemoryLedger::new(7);
        assert!(matches!(
            ledger.mint(Address::ZERO, asset(1)),
            Err(LedgerError::ZeroRecipient)
        ));
    }

    #[test]
    fn burn_removes_asset() {
        let mut ledger = MemoryLedger::new(7);
        let alice = addr();
        ledger.mint(alice, asset(1)).unwrap();
        ledger.burn(asset(1)).unwrap();
        assert!(ledger.owner_of(asset(1)).is_err());
        assert!(matches!(
            ledger.burn(asset(1)),
            Err(LedgerError::UnknownAsset(_))
        ));
    }

    #[test]
    fn transfer_moves_ownership_and_clears_approval() {
        let mut ledger = MemoryLedger::new(7);
        let (alice, bob, carol) = (addr(), addr(), addr());
        ledger.mint(alice, asset(1)).unwrap();
        ledger.set_approved(asset(1), Some(carol));

        ledger.transfer(alice, bob, asset(1)).unwrap();
        assert_eq!(ledger.owner_of(asset(1)).unwrap(), bob);
        assert_eq!(ledger.get_approved(asset(1)), None);
    }

    #[test]
    fn transfer_from_non_owner_rejected() {
        let mut ledger = MemoryLedger::new(7);
        let (alice, bob) = (addr(), addr());
        ledger.mint(alice, asset(1)).unwrap();
        assert!(matches!(
            ledger.transfer(bob, alice, asset(1)),
            Err(LedgerError::NotOwner { .. })
        ));
    }

    #[test]
    fn operator_toggle_is_visible() {
        let mut ledger = MemoryLedger::new(7);
        let (alice, op) = (addr(), addr());
        assert!(!ledger.is_approved_for_all(alice, op));
        ledger.set_operator(alice, op, true);
        assert!(ledger.is_approved_for_all(alice, op));
        ledger.set_operator(alice, op, false);
        assert!(!ledger.is_approved_for_all(alice, op));
    }

    #[test]
    fn receiver_ack_gates_transfer() {
        let mut ledger = MemoryLedger::new(7);
        let (alice, hook_account) = (addr(), addr());
        ledger.register_receiver(
            hook_account,
            Box::new(ScriptedReceiver {
                ack: *b"NOPE",
                received: Vec::new(),
            }),
        );
        ledger.mint(alice, asset(1)).unwrap();

        let err = ledger.transfer(alice, hook_account, asset(1)).unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverRejected(_)));
        // Rejected transfer leaves ownership untouched.
        assert_eq!(ledger.owner_of(asset(1)).unwrap(), alice);
    }

    #[test]
    fn receiver_ack_gates_mint() {
        let mut ledger = MemoryLedger::new(7);
        let hook_account = addr();
        ledger.register_receiver(
            hook_account,
            Box::new(ScriptedReceiver {
                ack: RECEIVER_ACK,
                received: Vec::new(),
            }),
        );
        ledger.mint(hook_account, asset(2)).unwrap();
        assert_eq!(ledger.owner_of(asset(2)).unwrap(), hook_account);
    }
}
