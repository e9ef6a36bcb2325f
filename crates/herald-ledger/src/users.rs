//! Subscriber registry and public-key registration.

use std::collections::BTreeMap;

use herald_core::{Address, Event, PublicKey, User};
use serde::{Deserialize, Serialize};

use crate::capabilities::KeyVerifier;
use crate::error::{LedgerError, Result};
use crate::state::entries;
use crate::txn::Txn;

/// Activated users keyed by address, with activation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistry {
    #[serde(with = "entries")]
    users: BTreeMap<Address, User>,
    order: Vec<Address>,
}

impl UserRegistry {
    pub fn get(&self, address: &Address) -> Option<&User> {
        self.users.get(address)
    }

    /// The `index`-th user ever activated.
    pub fn at(&self, index: usize) -> Option<(&Address, &User)> {
        let address = self.order.get(index)?;
        self.users.get(address).map(|user| (address, user))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn put(&mut self, address: Address, user: User) {
        self.users.insert(address, user);
    }

    pub(crate) fn extend_order(&mut self, activated: Vec<Address>) {
        self.order.extend(activated);
    }
}

impl Txn<'_> {
    /// Stage registration of `public_key` for `address`.
    ///
    /// A user whose key is already registered is left untouched: the key is
    /// not re-verified and no event is emitted.
    pub(crate) fn register_key(
        &mut self,
        keys: &dyn KeyVerifier,
        address: Address,
        public_key: PublicKey,
    ) -> Result<()> {
        if self.user(&address).is_some_and(User::public_key_registered) {
            return Ok(());
        }
        if !keys.verify_public_key(&address, &public_key) {
            return Err(LedgerError::KeyMismatch(address));
        }

        self.activate_user(address).public_key = Some(public_key);
        self.emit(Event::PublicKeyRegistered {
            address,
            public_key,
        });
        Ok(())
    }
}
