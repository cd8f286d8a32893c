//! # Payment Endpoints
//!
//! The marketplace settles listings in a native unit of account, and the
//! one payment it ever *initiates* is the overpayment refund during
//! fulfillment. The counterparty of that refund is an arbitrary external
//! account — possibly programmable, possibly hostile — so the operation is
//! modeled as a fallible call through the [`PaymentEndpoint`] trait: the
//! endpoint either accepts the funds or the whole fulfillment unwinds.
//!
//! [`MemoryBank`] is the in-process implementation: plain balances plus a
//! per-account "refuses payments" flag for exercising the rejection path.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::crypto::keys::Address;

/// Errors surfaced by payment delivery.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The recipient refused the funds.
    #[error("payment of {amount} to {to} rejected by recipient")]
    Rejected {
        /// Intended recipient.
        to: Address,
        /// Amount that was refused.
        amount: u64,
    },

    /// Crediting the recipient would overflow its balance.
    #[error("payment of {amount} would overflow recipient balance")]
    BalanceOverflow {
        /// Amount that was attempted.
        amount: u64,
    },
}

/// An external account capable of receiving funds.
///
/// `pay` is synchronous and all-or-nothing: on `Err` no funds moved.
pub trait PaymentEndpoint {
    /// Deliver `amount` to `to`.
    fn pay(&mut self, to: Address, amount: u64) -> Result<(), PaymentError>;
}

/// In-memory balance book implementing [`PaymentEndpoint`].
#[derive(Debug, Default)]
pub struct MemoryBank {
    balances: HashMap<Address, u64>,
    refusing: HashSet<Address>,
}

impl MemoryBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance of `account`, zero if unknown.
    pub fn balance_of(&self, account: Address) -> u64 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    /// Mark `account` as refusing all incoming payments. Refunds to such
    /// an account fail, which is exactly what the marketplace's
    /// `RefundFailed` path needs to see in tests.
    pub fn set_refusing(&mut self, account: Address, refusing: bool) {
        if refusing {
            self.refusing.insert(account);
        } else {
            self.refusing.remove(&account);
        }
    }
}

impl PaymentEndpoint for MemoryBank {
    fn pay(&mut self, to: Address, amount: u64) -> Result<(), PaymentError> {
        if self.refusing.contains(&to) {
            return Err(PaymentError::Rejected { to, amount });
        }
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(PaymentError::BalanceOverflow { amount })?;
        Ok(())
    }
}
