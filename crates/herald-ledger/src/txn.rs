//! Staged transactions over committed state.
//!
//! A [`Txn`] reads through its own write set to the committed state, and
//! copies records into the write set on first mutation. Dropping a `Txn`
//! discards everything it staged.

use herald_core::{
    Address, Amount, Channel, ChannelGroup, Event, Height, Membership, MembershipKey, User,
};

use crate::config::LedgerConfig;
use crate::pool::{FeeLedger, PoolLedger, Settlement};
use crate::state::{LedgerState, WriteSet};

pub(crate) struct Txn<'s> {
    state: &'s LedgerState,
    config: &'s LedgerConfig,
    at: Height,
    writes: WriteSet,
}

impl<'s> Txn<'s> {
    pub(crate) fn begin(state: &'s LedgerState, config: &'s LedgerConfig, at: Height) -> Self {
        Self {
            state,
            config,
            at,
            writes: WriteSet::default(),
        }
    }

    pub(crate) fn at(&self) -> Height {
        self.at
    }

    pub(crate) fn config(&self) -> &'s LedgerConfig {
        self.config
    }

    pub(crate) fn into_writes(self) -> WriteSet {
        self.writes
    }

    // Channels

    pub(crate) fn channel(&self, owner: &Address) -> Option<&Channel> {
        self.writes
            .channels
            .get(owner)
            .or_else(|| self.state.channels.get(owner))
    }

    pub(crate) fn channel_mut(&mut self, owner: &Address) -> Option<&mut Channel> {
        if !self.writes.channels.contains_key(owner) {
            let committed = self.state.channels.get(owner)?.clone();
            self.writes.channels.insert(*owner, committed);
        }
        self.writes.channels.get_mut(owner)
    }

    pub(crate) fn insert_channel(&mut self, channel: Channel) {
        let owner = channel.owner;
        self.writes.channels.insert(owner, channel);
        self.writes.new_channels.push(owner);
    }

    // Users

    pub(crate) fn user(&self, address: &Address) -> Option<&User> {
        self.writes
            .users
            .get(address)
            .or_else(|| self.state.users.get(address))
    }

    pub(crate) fn user_mut(&mut self, address: &Address) -> Option<&mut User> {
        if !self.writes.users.contains_key(address) {
            let committed = self.state.users.get(address)?.clone();
            self.writes.users.insert(*address, committed);
        }
        self.writes.users.get_mut(address)
    }

    /// The user at `address`, activated at the current height if new.
    pub(crate) fn activate_user(&mut self, address: Address) -> &mut User {
        if self.user_mut(&address).is_none() {
            self.writes
                .users
                .insert(address, User::activated_at(self.at));
            self.writes.new_users.push(address);
        }
        self.writes.users.entry(address).or_default()
    }

    // Memberships

    pub(crate) fn membership(&self, channel: Address, subscriber: Address) -> Membership {
        let key = MembershipKey::new(channel, subscriber);
        self.writes
            .memberships
            .get(&key)
            .copied()
            .unwrap_or_else(|| self.state.memberships.get(channel, subscriber))
    }

    pub(crate) fn set_membership(
        &mut self,
        channel: Address,
        subscriber: Address,
        membership: Membership,
    ) {
        self.writes
            .memberships
            .insert(MembershipKey::new(channel, subscriber), membership);
    }

    // Group, pool, fees

    pub(crate) fn group(&self) -> ChannelGroup {
        self.writes.group.unwrap_or(self.state.group)
    }

    pub(crate) fn set_group(&mut self, group: ChannelGroup) {
        self.writes.group = Some(group);
    }

    fn pool(&self) -> PoolLedger {
        self.writes.pool.unwrap_or(self.state.pool)
    }

    fn fees(&self) -> FeeLedger {
        self.writes.fees.unwrap_or(self.state.fees)
    }

    pub(crate) fn record_deposit(&mut self, payer: Address, principal: Amount, receipts: Amount) {
        let mut pool = self.pool();
        pool.record_deposit(principal, receipts);
        self.writes.pool = Some(pool);
        self.writes.settlements.push(Settlement::Deposit {
            payer,
            principal,
            receipts,
        });
    }

    pub(crate) fn record_fee(&mut self, payer: Address, fee: Amount) {
        let mut fees = self.fees();
        fees.record_fee(fee);
        self.writes.fees = Some(fees);
        self.writes
            .settlements
            .push(Settlement::Fee { payer, amount: fee });
    }

    pub(crate) fn emit(&mut self, event: Event) {
        self.writes.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_reads_fall_through_to_committed_state() {
        let mut state = LedgerState::default();
        state.users.put(addr(1), User::activated_at(3));
        state.users.extend_order(vec![addr(1)]);
        let config = LedgerConfig::default();

        let txn = Txn::begin(&state, &config, 10);
        assert_eq!(txn.user(&addr(1)).map(|u| u.start_block), Some(3));
        assert!(txn.user(&addr(2)).is_none());
    }

    #[test]
    fn test_dropped_txn_leaves_state_untouched() {
        let state = LedgerState::default();
        let config = LedgerConfig::default();
        let before = state.clone();

        let mut txn = Txn::begin(&state, &config, 10);
        txn.activate_user(addr(1)).subscribed_count = 4;
        txn.record_fee(addr(2), 7);
        drop(txn);

        assert_eq!(state, before);
    }

    #[test]
    fn test_activation_is_recorded_once() {
        let mut state = LedgerState::default();
        let config = LedgerConfig::default();

        let mut txn = Txn::begin(&state, &config, 10);
        txn.activate_user(addr(1));
        txn.activate_user(addr(1)).subscribed_count = 2;
        let writes = txn.into_writes();
        state.apply(writes, 10);

        assert_eq!(state.users.len(), 1);
        assert_eq!(state.users.get(&addr(1)).map(|u| u.subscribed_count), Some(2));
        assert_eq!(state.last_height(), 10);
    }

    #[test]
    fn test_existing_user_keeps_start_block() {
        let mut state = LedgerState::default();
        state.users.put(addr(1), User::activated_at(3));
        state.users.extend_order(vec![addr(1)]);
        let config = LedgerConfig::default();

        let mut txn = Txn::begin(&state, &config, 10);
        txn.activate_user(addr(1)).subscribed_count = 1;
        let writes = txn.into_writes();
        state.apply(writes, 10);

        let user = state.users.get(&addr(1)).unwrap();
        assert_eq!(user.start_block, 3);
        assert_eq!(user.subscribed_count, 1);
        assert_eq!(state.users.len(), 1);
    }
}
