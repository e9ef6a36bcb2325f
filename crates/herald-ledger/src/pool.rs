//! Pool and delegation-fee bookkeeping.
//!
//! Only inflows are tracked here. Withdrawals belong to the surrounding
//! protocol.

use herald_core::{Address, Amount};
use serde::{Deserialize, Serialize};

/// Principal staked by all channels and the vault receipts held for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    /// Cumulative principal deposited by channels.
    pub pool_funds: Amount,
    /// Yield-bearing receipts returned by the vault for that principal.
    pub yield_receipts: Amount,
}

impl PoolLedger {
    pub(crate) fn record_deposit(&mut self, principal: Amount, receipts: Amount) {
        self.pool_funds = self.pool_funds.saturating_add(principal);
        self.yield_receipts = self.yield_receipts.saturating_add(receipts);
    }
}

/// An asset movement made while staging an operation.
///
/// Settlements are reversed if the staged operation is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// `principal` moved from `payer` into the vault for `receipts`.
    Deposit {
        payer: Address,
        principal: Amount,
        receipts: Amount,
    },
    /// `amount` moved from `payer` to the protocol.
    Fee { payer: Address, amount: Amount },
}

/// Fees collected from delegated actions, payable to the protocol owner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeLedger {
    pub owner_funds: Amount,
}

impl FeeLedger {
    pub(crate) fn record_fee(&mut self, fee: Amount) {
        self.owner_funds = self.owner_funds.saturating_add(fee);
    }
}
