//! In-memory capability implementations.
//!
//! Deterministic stand-ins for the allow-list, the stable asset, and the
//! yield vault. Thread-safe via RwLock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use herald_core::{Address, Amount};

use super::{AllowList, AssetLedger, YieldVault};
use crate::error::CapabilityError;

fn poisoned<T>(e: PoisonError<T>) -> CapabilityError {
    CapabilityError::Unavailable(format!("lock poisoned: {}", e))
}

/// Allow-list backed by a set of addresses.
#[derive(Debug, Default)]
pub struct MemoryAllowList {
    allowed: RwLock<HashSet<Address>>,
}

impl MemoryAllowList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, address: Address) {
        self.allowed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(address);
    }

    pub fn revoke(&self, address: &Address) {
        self.allowed
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(address);
    }
}

impl AllowList for MemoryAllowList {
    fn is_whitelisted(&self, address: &Address) -> bool {
        self.allowed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(address)
    }
}

/// A mintable stable asset.
#[derive(Debug, Default)]
pub struct MemoryToken {
    balances: RwLock<HashMap<Address, Amount>>,
}

impl MemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `to` out of thin air.
    pub fn mint(&self, to: Address, amount: Amount) {
        let mut balances = self.balances.write().unwrap_or_else(PoisonError::into_inner);
        let balance = balances.entry(to).or_default();
        *balance = balance.saturating_add(amount);
    }
}

impl AssetLedger for MemoryToken {
    fn transfer_from(
        &self,
        payer: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), CapabilityError> {
        let mut balances = self.balances.write().map_err(poisoned)?;

        let available = balances.get(payer).copied().unwrap_or(0);
        if available < amount {
            return Err(CapabilityError::InsufficientFunds {
                payer: *payer,
                needed: amount,
                available,
            });
        }

        balances.insert(*payer, available - amount);
        let credited = balances.entry(*recipient).or_default();
        *credited = credited.saturating_add(amount);
        Ok(())
    }

    fn balance_of(&self, address: &Address) -> Amount {
        self.balances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .copied()
            .unwrap_or(0)
    }
}

/// A vault that takes the stable asset and mints receipts 1:1.
#[derive(Debug)]
pub struct MemoryVault {
    token: Arc<MemoryToken>,
    /// Account the vault parks deposited principal in.
    reserve: Address,
    receipts: RwLock<HashMap<Address, Amount>>,
    paused: AtomicBool,
}

impl MemoryVault {
    pub fn new(token: Arc<MemoryToken>) -> Self {
        Self {
            token,
            reserve: Address::from_label("herald.vault.reserve"),
            receipts: RwLock::new(HashMap::new()),
            paused: AtomicBool::new(false),
        }
    }

    /// Refuse deposits while paused.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Principal the vault currently holds.
    pub fn reserve_balance(&self) -> Amount {
        self.token.balance_of(&self.reserve)
    }
}

impl YieldVault for MemoryVault {
    fn deposit(&self, depositor: &Address, amount: Amount) -> Result<Amount, CapabilityError> {
        if self.paused.load(Ordering::SeqCst) {
            return Err(CapabilityError::VaultRejected("vault paused".into()));
        }

        self.token.transfer_from(depositor, &self.reserve, amount)?;

        let mut receipts = self.receipts.write().map_err(poisoned)?;
        let held = receipts.entry(*depositor).or_default();
        *held = held.saturating_add(amount);
        Ok(amount)
    }

    fn withdraw(&self, holder: &Address, receipts: Amount) -> Result<Amount, CapabilityError> {
        let mut held = self.receipts.write().map_err(poisoned)?;
        let balance = held.get(holder).copied().unwrap_or(0);
        if balance < receipts {
            return Err(CapabilityError::VaultRejected(format!(
                "{} holds {} receipts, redeeming {}",
                holder, balance, receipts
            )));
        }

        self.token.transfer_from(&self.reserve, holder, receipts)?;
        held.insert(*holder, balance - receipts);
        Ok(receipts)
    }

    fn receipt_balance(&self, holder: &Address) -> Amount {
        self.receipts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(holder)
            .copied()
            .unwrap_or(0)
    }
}
