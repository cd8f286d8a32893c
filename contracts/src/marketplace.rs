//! # Marketplace
//!
//! Peer-to-peer escrowed trading of ledger-tracked assets. Listing an
//! asset moves it into marketplace custody; a listing then ends in exactly
//! one of two terminal ways — fulfilled by a buyer or cancelled by the
//! asker — and the asset leaves escrow accordingly. Listings are never
//! deleted: terminal records stay queryable.
//!
//! ## Listing identifiers
//!
//! A listing id is `H(asset || price || expiry || salt || position)` over
//! fixed-width encodings, where `position` is the ledger's current
//! mutation counter. Folding the position in means resubmitting an
//! identical tuple later yields a fresh id. The flip side: two listings of
//! the same tuple at the *same* position produce the same id, and the
//! second silently replaces the first record. That overwrite is the
//! documented behavior of `list`, not an accident.
//!
//! ## Fulfillment state
//!
//! The terminal marker is an explicit tagged state —
//! [`Fulfillment::Active`], [`Fulfillment::Sold`] (with time and buyer),
//! [`Fulfillment::Cancelled`] — rather than an overloaded timestamp with
//! a magic maximal value. "Fulfilled" means either terminal variant.
//!
//! Note that `fulfill` does not check listing expiry: an expired but
//! unfulfilled listing remains purchasable. Expiry gates `update` (via
//! the active check) and selects which cancellation notification fires,
//! nothing more.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use arbor_protocol::crypto::{blake3_hash_multi, Address};
use arbor_protocol::ledger::{AssetId, AssetLedger, LedgerError};
use arbor_protocol::payment::{PaymentEndpoint, PaymentError};
use arbor_protocol::time::{Clock, SystemClock};

use crate::certification::Salt;
use crate::guard::{ReentrancyGuard, ReentrantCall};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during marketplace operations.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// The caller lacks the required relationship to the asset or listing.
    #[error("unauthorized marketplace operation")]
    Unauthorized,

    /// The referenced listing was never recorded.
    #[error("unknown listing: {0}")]
    UnknownListing(ListingId),

    /// The listing is not currently active (terminal or expired).
    #[error("listing is not active: {0}")]
    NotActive(ListingId),

    /// The listing already reached a terminal state (sold or cancelled).
    #[error("listing already fulfilled: {0}")]
    AlreadyFulfilled(ListingId),

    /// The tendered amount does not cover the listing price.
    #[error("insufficient payment: tendered {tendered}, price {price}")]
    InsufficientPayment {
        /// What the buyer sent.
        tendered: u64,
        /// What the listing asks.
        price: u64,
    },

    /// The buyer's overpayment refund was rejected by its recipient.
    #[error("refund of {amount} failed")]
    RefundFailed {
        /// The excess that could not be returned.
        amount: u64,
        #[source]
        source: PaymentError,
    },

    /// Recording the sale would overflow the proceeds total.
    #[error("recording sale of {amount} would overflow proceeds")]
    ProceedsOverflow {
        /// The price that could not be accrued.
        amount: u64,
    },

    /// A guarded entry point was re-entered while an operation was in
    /// flight.
    #[error("reentrant call rejected")]
    Reentrant,

    /// The asset ledger refused an operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl From<ReentrantCall> for MarketplaceError {
    fn from(_: ReentrantCall) -> Self {
        MarketplaceError::Reentrant
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A 32-byte listing identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub [u8; 32]);

impl ListingId {
    /// Hex-encoded representation, 64 characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListingId({})", &self.to_hex()[..16])
    }
}

/// The terminal-state marker of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fulfillment {
    /// Still open.
    Active,
    /// Bought out.
    Sold {
        /// Unix timestamp of the sale.
        at: u64,
        /// Who paid.
        buyer: Address,
    },
    /// Withdrawn by the asker.
    Cancelled,
}

impl Fulfillment {
    /// True for either terminal variant.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Fulfillment::Active)
    }
}

/// A marketplace listing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    /// Who listed the asset (and receives it back on cancellation).
    pub asker: Address,
    /// The escrowed asset.
    pub asset: AssetId,
    /// Asking price.
    pub price: u64,
    /// Unix timestamp after which the listing counts as expired.
    /// `0` means it never expires.
    pub expiry: u64,
    /// Unix timestamp of listing creation. Always `> 0` for a recorded
    /// listing.
    pub created_at: u64,
    /// The terminal-state marker.
    pub fulfillment: Fulfillment,
}

impl Listing {
    /// The buyer, once sold.
    pub fn bidder(&self) -> Option<Address> {
        match self.fulfillment {
            Fulfillment::Sold { buyer, .. } => Some(buyer),
            _ => None,
        }
    }
}

/// Notifications emitted by marketplace state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketplaceEvent {
    /// An asset was listed and escrowed.
    Listed {
        /// The new listing.
        id: ListingId,
        /// The listing party.
        asker: Address,
        /// The escrowed asset.
        asset: AssetId,
        /// Asking price.
        price: u64,
    },
    /// Price and/or expiry changed.
    ListingUpdated {
        /// The updated listing.
        id: ListingId,
        /// Price after the update.
        price: u64,
        /// Expiry after the update.
        expiry: u64,
    },
    /// Cancelled while still unexpired.
    ListingCancelled {
        /// The cancelled listing.
        id: ListingId,
    },
    /// Cancelled after its expiry had passed. Mutually exclusive with
    /// [`MarketplaceEvent::ListingCancelled`] for a given cancellation.
    ListingExpired {
        /// The cancelled listing.
        id: ListingId,
    },
    /// Bought out.
    Fulfilled {
        /// The fulfilled listing.
        id: ListingId,
        /// Who bought it.
        buyer: Address,
        /// The price paid (excess was refunded).
        price: u64,
    },
}

// ---------------------------------------------------------------------------
// Listing id derivation
// ---------------------------------------------------------------------------

/// Derive the deterministic listing id for the given parameters at a
/// ledger position: `H(asset || price || expiry || salt || position)`
/// over fixed-width encodings.
///
/// Pure — clients call this with `ledger.position()` to predict the id a
/// `list` call will produce before submitting it.
pub fn listing_id(
    asset: AssetId,
    price: u64,
    expiry: u64,
    salt: &Salt,
    position: u64,
) -> ListingId {
    ListingId(blake3_hash_multi(&[
        asset.as_bytes(),
        &price.to_be_bytes(),
        &expiry.to_be_bytes(),
        salt,
        &position.to_be_bytes(),
    ]))
}

// ---------------------------------------------------------------------------
// Marketplace
// ---------------------------------------------------------------------------

/// The escrow state machine over listings.
pub struct Marketplace {
    /// The escrow identity — assets in custody are owned by this address
    /// on the ledger.
    address: Address,
    /// Time source for creation/sale stamps and expiry checks.
    clock: Arc<dyn Clock>,
    /// Listing records keyed by listing id. Never deleted.
    listings: HashMap<ListingId, Listing>,
    /// Per-instance mutual exclusion for state-changing entry points.
    guard: ReentrancyGuard,
    /// Pending event records, drained by [`take_events`](Self::take_events).
    events: Vec<MarketplaceEvent>,
    /// Sale payments retained in escrow.
    proceeds: u64,
}

impl Marketplace {
    /// Create a marketplace with the system clock.
    pub fn new(address: Address) -> Self {
        Self::with_clock(address, Arc::new(SystemClock))
    }

    /// Create a marketplace with an explicit clock.
    pub fn with_clock(address: Address, clock: Arc<dyn Clock>) -> Self {
        Self {
            address,
            clock,
            listings: HashMap::new(),
            guard: ReentrancyGuard::new(),
            events: Vec::new(),
            proceeds: 0,
        }
    }

    /// The escrow identity.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Total sale payments currently held.
    pub fn proceeds(&self) -> u64 {
        self.proceeds
    }

    // -----------------------------------------------------------------------
    // List
    // -----------------------------------------------------------------------

    /// List an asset for sale, escrowing it with the marketplace.
    ///
    /// The caller must be the asset's owner, its approved delegate, or an
    /// approved operator of the owner. Returns the listing id derived at
    /// the current ledger position; a second listing of an identical tuple
    /// at the same position replaces the prior record (see module docs).
    pub fn list(
        &mut self,
        ledger: &mut dyn AssetLedger,
        caller: Address,
        asset: AssetId,
        price: u64,
        expiry: u64,
        salt: Salt,
    ) -> Result<ListingId, MarketplaceError> {
        let _permit = self.guard.enter()?;

        let owner = ledger.owner_of(asset)?;
        let authorized = caller == owner
            || ledger.get_approved(asset) == Some(caller)
            || ledger.is_approved_for_all(owner, caller);
        if !authorized {
            return Err(MarketplaceError::Unauthorized);
        }

        let id = listing_id(asset, price, expiry, &salt, ledger.position());
        let prior = self.listings.insert(
            id,
            Listing {
                asker: caller,
                asset,
                price,
                expiry,
                created_at: self.clock.now(),
                fulfillment: Fulfillment::Active,
            },
        );

        if let Err(err) = ledger.transfer(owner, self.address, asset) {
            // Unwind the record (restoring whatever the insert displaced).
            match prior {
                Some(prev) => self.listings.insert(id, prev),
                None => self.listings.remove(&id),
            };
            return Err(err.into());
        }

        info!(id = %id, asker = %caller, asset = %asset, price, "asset listed");
        self.events.push(MarketplaceEvent::Listed {
            id,
            asker: caller,
            asset,
            price,
        });
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Change the price and/or expiry of an active listing. Asker-only.
    ///
    /// A zero `new_price` or `new_expiry` means "leave unchanged" — which
    /// makes an explicit zero unrepresentable through this operation.
    pub fn update(
        &mut self,
        caller: Address,
        id: ListingId,
        new_price: u64,
        new_expiry: u64,
    ) -> Result<(), MarketplaceError> {
        let _permit = self.guard.enter()?;

        let active = self.active(id);
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketplaceError::UnknownListing(id))?;
        if caller != listing.asker {
            return Err(MarketplaceError::Unauthorized);
        }
        if !active {
            return Err(MarketplaceError::NotActive(id));
        }

        if new_price != 0 {
            listing.price = new_price;
        }
        if new_expiry != 0 {
            listing.expiry = new_expiry;
        }
        let (price, expiry) = (listing.price, listing.expiry);

        debug!(id = %id, price, expiry, "listing updated");
        self.events
            .push(MarketplaceEvent::ListingUpdated { id, price, expiry });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Cancel
    // -----------------------------------------------------------------------

    /// Withdraw a listing and return the escrowed asset to the asker.
    ///
    /// Asker-only; fails with [`MarketplaceError::AlreadyFulfilled`] once
    /// the listing is terminal. Expiry does not block cancellation — it
    /// only selects which notification fires: `ListingExpired` when the
    /// listing had already lapsed, `ListingCancelled` otherwise.
    pub fn cancel(
        &mut self,
        ledger: &mut dyn AssetLedger,
        caller: Address,
        id: ListingId,
    ) -> Result<AssetId, MarketplaceError> {
        let _permit = self.guard.enter()?;

        let was_expired = self.expired(id);
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketplaceError::UnknownListing(id))?;
        if caller != listing.asker {
            return Err(MarketplaceError::Unauthorized);
        }
        if listing.fulfillment.is_terminal() {
            return Err(MarketplaceError::AlreadyFulfilled(id));
        }

        let asset = listing.asset;
        let asker = listing.asker;
        // Terminal state lands before the escrow-return transfer, which
        // can run the asker's receive hook.
        listing.fulfillment = Fulfillment::Cancelled;

        if let Err(err) = ledger.transfer(self.address, asker, asset) {
            if let Some(listing) = self.listings.get_mut(&id) {
                listing.fulfillment = Fulfillment::Active;
            }
            return Err(err.into());
        }

        info!(id = %id, asker = %asker, expired = was_expired, "listing cancelled");
        self.events.push(if was_expired {
            MarketplaceEvent::ListingExpired { id }
        } else {
            MarketplaceEvent::ListingCancelled { id }
        });
        Ok(asset)
    }

    // -----------------------------------------------------------------------
    // Fulfill
    // -----------------------------------------------------------------------

    /// Buy a listing: pay at least the asking price, receive the asset.
    /// Open to any caller, including on expired listings (see module docs).
    ///
    /// The excess over the price is refunded to the caller through
    /// `payments` as part of the same operation; a rejected refund fails
    /// the whole purchase with [`MarketplaceError::RefundFailed`] and no
    /// state change survives.
    pub fn fulfill(
        &mut self,
        ledger: &mut dyn AssetLedger,
        payments: &mut dyn PaymentEndpoint,
        caller: Address,
        id: ListingId,
        tendered: u64,
    ) -> Result<AssetId, MarketplaceError> {
        let _permit = self.guard.enter()?;

        let now = self.clock.now();
        let listing = self
            .listings
            .get_mut(&id)
            .ok_or(MarketplaceError::UnknownListing(id))?;
        if listing.fulfillment.is_terminal() {
            return Err(MarketplaceError::AlreadyFulfilled(id));
        }
        if tendered < listing.price {
            return Err(MarketplaceError::InsufficientPayment {
                tendered,
                price: listing.price,
            });
        }

        let asset = listing.asset;
        let price = listing.price;
        let refund = tendered - price;
        // Accrual is checked up front so the commit below cannot fail
        // after external calls have run.
        let proceeds = self
            .proceeds
            .checked_add(price)
            .ok_or(MarketplaceError::ProceedsOverflow { amount: price })?;
        // Terminal state lands before any external call gets control.
        listing.fulfillment = Fulfillment::Sold { at: now, buyer: caller };

        // Settlement order: refund first, asset second. A payment cannot
        // be clawed back once delivered, so the refund must settle while
        // the ledger is still untouched — a rejection here unwinds with
        // nothing moved.
        if refund > 0 {
            if let Err(source) = payments.pay(caller, refund) {
                if let Some(listing) = self.listings.get_mut(&id) {
                    listing.fulfillment = Fulfillment::Active;
                }
                return Err(MarketplaceError::RefundFailed {
                    amount: refund,
                    source,
                });
            }
            debug!(id = %id, buyer = %caller, refund, "overpayment refunded");
        }

        if let Err(err) = ledger.transfer(self.address, caller, asset) {
            if let Some(listing) = self.listings.get_mut(&id) {
                listing.fulfillment = Fulfillment::Active;
            }
            return Err(err.into());
        }

        self.proceeds = proceeds;
        info!(id = %id, buyer = %caller, price, "listing fulfilled");
        self.events.push(MarketplaceEvent::Fulfilled {
            id,
            buyer: caller,
            price,
        });
        Ok(asset)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The full listing record, if it exists.
    pub fn get_listing(&self, id: ListingId) -> Option<&Listing> {
        self.listings.get(&id)
    }

    /// Whether a listing was ever recorded at `id`.
    pub fn is_listing_valid(&self, id: ListingId) -> bool {
        self.listings.get(&id).is_some_and(|l| l.created_at > 0)
    }

    /// valid ∧ ¬fulfilled ∧ ¬expired.
    pub fn is_listing_active(&self, id: ListingId) -> bool {
        self.active(id)
    }

    /// Whether the listing has passed its expiry. Listings with
    /// `expiry = 0` never expire; the bound is exclusive (`expiry < now`
    /// is expired, `expiry == now` is not yet).
    pub fn is_listing_expired(&self, id: ListingId) -> bool {
        self.expired(id)
    }

    /// Whether the listing reached a terminal state — true for both sold
    /// and cancelled.
    pub fn is_listing_fulfilled(&self, id: ListingId) -> bool {
        self.listings
            .get(&id)
            .is_some_and(|l| l.fulfillment.is_terminal())
    }

    /// Drain and return the pending event records.
    pub fn take_events(&mut self) -> Vec<MarketplaceEvent> {
        std::mem::take(&mut self.events)
    }

    fn active(&self, id: ListingId) -> bool {
        self.is_listing_valid(id) && !self.is_listing_fulfilled(id) && !self.expired(id)
    }

    fn expired(&self, id: ListingId) -> bool {
        self.listings
            .get(&id)
            .is_some_and(|l| l.expiry != 0 && l.expiry < self.clock.now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(n: u8) -> AssetId {
        AssetId([n; 32])
    }

    #[test]
    fn listing_id_deterministic() {
        let salt = [3u8; 32];
        let a = listing_id(asset(1), 100, 0, &salt, 5);
        let b = listing_id(asset(1), 100, 0, &salt, 5);
        assert_eq!(a, b);
    }

    #[test]
    fn listing_id_varies_with_every_input() {
        let salt = [3u8; 32];
        let base = listing_id(asset(1), 100, 0, &salt, 5);
        assert_ne!(base, listing_id(asset(2), 100, 0, &salt, 5));
        assert_ne!(base, listing_id(asset(1), 101, 0, &salt, 5));
        assert_ne!(base, listing_id(asset(1), 100, 9, &salt, 5));
        assert_ne!(base, listing_id(asset(1), 100, 0, &[4u8; 32], 5));
        // Same tuple, later ledger position: a fresh id.
        assert_ne!(base, listing_id(asset(1), 100, 0, &salt, 6));
    }

    #[test]
    fn fulfillment_terminality() {
        assert!(!Fulfillment::Active.is_terminal());
        assert!(Fulfillment::Cancelled.is_terminal());
        assert!(Fulfillment::Sold {
            at: 1,
            buyer: Address::ZERO
        }
        .is_terminal());
    }

    #[test]
    fn queries_on_unknown_listing_are_false() {
        let marketplace = Marketplace::new(Address([9u8; 32]));
        let id = ListingId([1u8; 32]);
        assert!(!marketplace.is_listing_valid(id));
        assert!(!marketplace.is_listing_active(id));
        assert!(!marketplace.is_listing_expired(id));
        assert!(!marketplace.is_listing_fulfilled(id));
        assert!(marketplace.get_listing(id).is_none());
    }
}
