//! Capability interfaces for the ledger's external collaborators.
//!
//! The ledger never moves assets or checks signatures itself. It queries
//! these injected capabilities synchronously and trusts their answers for the
//! duration of one operation. Production implementations live outside this
//! crate; [`memory`] provides deterministic in-memory ones.

use std::fmt;
use std::sync::Arc;

use ed25519_dalek::VerifyingKey;
use herald_core::{Address, Amount, PublicKey};

use crate::error::CapabilityError;

pub mod memory;

/// Decides who may create channels.
pub trait AllowList: Send + Sync {
    fn is_whitelisted(&self, address: &Address) -> bool;
}

/// The stable asset channels stake and pay fees in.
pub trait AssetLedger: Send + Sync {
    /// Move `amount` from `payer` to `recipient`.
    fn transfer_from(
        &self,
        payer: &Address,
        recipient: &Address,
        amount: Amount,
    ) -> Result<(), CapabilityError>;

    fn balance_of(&self, address: &Address) -> Amount;
}

/// The yield-bearing deposit venue holding pool principal.
pub trait YieldVault: Send + Sync {
    /// Deposit `amount` of the stable asset held by `depositor`.
    ///
    /// Returns the yield-bearing receipt amount credited to `depositor`.
    fn deposit(&self, depositor: &Address, amount: Amount) -> Result<Amount, CapabilityError>;

    /// Redeem `receipts` held by `holder` for the stable asset.
    ///
    /// Returns the principal paid out to `holder`.
    fn withdraw(&self, holder: &Address, receipts: Amount) -> Result<Amount, CapabilityError>;

    /// Yield-bearing receipts held by `holder`.
    fn receipt_balance(&self, holder: &Address) -> Amount;
}

/// Verifies that a public key belongs to an address.
pub trait KeyVerifier: Send + Sync {
    fn verify_public_key(&self, address: &Address, public_key: &PublicKey) -> bool;
}

/// Accepts an ed25519 key for the address derived from it.
///
/// The key must decode to a valid curve point and the address must equal
/// [`Address::derive`] of the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct DerivedKeyVerifier;

impl KeyVerifier for DerivedKeyVerifier {
    fn verify_public_key(&self, address: &Address, public_key: &PublicKey) -> bool {
        VerifyingKey::from_bytes(public_key.as_bytes()).is_ok()
            && Address::derive(public_key) == *address
    }
}

/// The bundle of collaborators a ledger is wired with.
#[derive(Clone)]
pub struct Capabilities {
    pub allow_list: Arc<dyn AllowList>,
    pub assets: Arc<dyn AssetLedger>,
    pub vault: Arc<dyn YieldVault>,
    pub keys: Arc<dyn KeyVerifier>,
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;

    #[test]
    fn test_derived_verifier_accepts_own_key() {
        let signing = SigningKey::from_bytes(&[0x11; 32]);
        let pk = PublicKey::from_bytes(signing.verifying_key().to_bytes());
        let address = Address::derive(&pk);

        assert!(DerivedKeyVerifier.verify_public_key(&address, &pk));
    }

    #[test]
    fn test_derived_verifier_rejects_foreign_key() {
        let alice = SigningKey::from_bytes(&[0x11; 32]);
        let bob = SigningKey::from_bytes(&[0x22; 32]);
        let alice_pk = PublicKey::from_bytes(alice.verifying_key().to_bytes());
        let bob_pk = PublicKey::from_bytes(bob.verifying_key().to_bytes());

        assert!(!DerivedKeyVerifier.verify_public_key(&Address::derive(&alice_pk), &bob_pk));
    }
}
