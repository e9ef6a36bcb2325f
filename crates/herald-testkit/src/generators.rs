//! Proptest generators for property-based testing.
//!
//! Operations refer to channels and parties by index into a [`Scenario`], so
//! any generated sequence can be replayed against a fresh ledger.

use proptest::prelude::*;

use herald_core::{Address, Amount, Event};
use herald_ledger::config::{DEFAULT_MAX_CONTRIBUTION, DEFAULT_MIN_CONTRIBUTION};
use herald_ledger::{Ledger, LedgerError};

use crate::fixtures::{multi_party, TestFixture, TestParty};

/// A ledger operation over scenario indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Subscribe { channel: usize, party: usize },
    SubscribeDelegated { channel: usize, party: usize },
    Unsubscribe { channel: usize, party: usize },
    /// The channel owner tries to leave their own channel.
    UnsubscribeOwner { channel: usize },
    Deactivate { channel: usize },
    UpdateMetadata { channel: usize },
    BroadcastKey { party: usize },
    /// Let heights pass without an operation.
    Advance(u64),
}

/// Generate a valid channel contribution.
pub fn contribution() -> impl Strategy<Value = Amount> {
    DEFAULT_MIN_CONTRIBUTION..=DEFAULT_MAX_CONTRIBUTION
}

/// Generate an operation over `channels` channels and `parties` parties.
pub fn op(channels: usize, parties: usize) -> impl Strategy<Value = Op> {
    let channel = 0..channels;
    let party = 0..parties;
    prop_oneof![
        4 => (channel.clone(), party.clone())
            .prop_map(|(channel, party)| Op::Subscribe { channel, party }),
        2 => (channel.clone(), party.clone())
            .prop_map(|(channel, party)| Op::SubscribeDelegated { channel, party }),
        3 => (channel.clone(), party.clone())
            .prop_map(|(channel, party)| Op::Unsubscribe { channel, party }),
        1 => channel.clone().prop_map(|channel| Op::UnsubscribeOwner { channel }),
        1 => channel.clone().prop_map(|channel| Op::Deactivate { channel }),
        1 => channel.prop_map(|channel| Op::UpdateMetadata { channel }),
        1 => party.prop_map(|party| Op::BroadcastKey { party }),
        2 => (1u64..50).prop_map(Op::Advance),
    ]
}

/// Generate up to `max_len` operations.
pub fn ops(channels: usize, parties: usize, max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(channels, parties), 0..=max_len)
}

/// A ledger with a fixed cast of channel owners and subscribers.
pub struct Scenario {
    pub fixture: TestFixture,
    pub ledger: Ledger,
    pub owners: Vec<TestParty>,
    pub parties: Vec<TestParty>,
}

impl Scenario {
    /// Open `channels` funded channels and prepare `parties` subscribers.
    ///
    /// Owners are funded for a few delegation fees.
    pub fn new(channels: usize, parties: usize) -> Self {
        let fixture = TestFixture::new();
        let mut ledger = fixture.ledger();

        let mut cast = multi_party(channels + parties);
        let parties = cast.split_off(channels);
        let owners = cast;

        for owner in &owners {
            if let Err(e) = fixture.open_channel(&mut ledger, owner.address) {
                panic!("opening channel for {} failed: {}", owner.address, e);
            }
            fixture.fund(owner.address, 3 * fixture.config.delegation_fee);
        }

        Self {
            fixture,
            ledger,
            owners,
            parties,
        }
    }

    pub fn channel(&self, index: usize) -> Address {
        self.owners[index].address
    }

    pub fn party(&self, index: usize) -> Address {
        self.parties[index].address
    }

    /// Apply `op` at the next height.
    pub fn apply(&mut self, op: &Op) -> Result<Vec<Event>, LedgerError> {
        let at = self.fixture.next_height();
        match *op {
            Op::Subscribe { channel, party } => {
                self.ledger
                    .subscribe(self.channel(channel), self.party(party), at)
            }
            Op::SubscribeDelegated { channel, party } => {
                self.ledger
                    .subscribe_delegated(self.channel(channel), self.party(party), at)
            }
            Op::Unsubscribe { channel, party } => {
                self.ledger
                    .unsubscribe(self.channel(channel), self.party(party), at)
            }
            Op::UnsubscribeOwner { channel } => {
                let owner = self.channel(channel);
                self.ledger.unsubscribe(owner, owner, at)
            }
            Op::Deactivate { channel } => self.ledger.deactivate_channel(self.channel(channel), at),
            Op::UpdateMetadata { channel } => {
                self.ledger
                    .update_metadata(self.channel(channel), format!("v{}", at), at)
            }
            Op::BroadcastKey { party } => {
                let party = &self.parties[party];
                self.ledger
                    .broadcast_public_key(party.address, party.public_key, at)
            }
            Op::Advance(blocks) => {
                self.fixture.advance(blocks);
                Ok(Vec::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use herald_core::{channel_weight, ADJUST_FOR_FLOAT};

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn test_weight_formula(c in contribution()) {
            let weight = channel_weight(c, DEFAULT_MIN_CONTRIBUTION).unwrap();
            prop_assert_eq!(weight, c * ADJUST_FOR_FLOAT / DEFAULT_MIN_CONTRIBUTION);
            prop_assert!(weight >= ADJUST_FOR_FLOAT);
        }

        #[test]
        fn test_member_count_tracks_net_subscriptions(ops in ops(3, 5, 60)) {
            let mut scenario = Scenario::new(3, 5);
            let mut net: HashMap<Address, i64> = HashMap::new();

            for op in &ops {
                for event in scenario.apply(op).unwrap_or_default() {
                    match event {
                        Event::Subscribed { channel, .. } => *net.entry(channel).or_default() += 1,
                        Event::Unsubscribed { channel, .. } => *net.entry(channel).or_default() -= 1,
                        _ => {}
                    }
                }
            }

            for i in 0..3 {
                let owner = scenario.channel(i);
                let channel = scenario.ledger.channel(&owner).unwrap();
                let expected = 1 + net.get(&owner).copied().unwrap_or(0);
                prop_assert_eq!(channel.member_count as i64, expected);
                prop_assert_eq!(channel.fair_share.count, channel.member_count);
                prop_assert!(scenario.ledger.member_exists(owner, owner));
            }
        }

        #[test]
        fn test_counters_match_membership_table(ops in ops(3, 5, 60)) {
            let mut scenario = Scenario::new(3, 5);
            for op in &ops {
                let _ = scenario.apply(op);
            }

            let mut per_channel: HashMap<Address, u64> = HashMap::new();
            let mut per_user: HashMap<Address, u64> = HashMap::new();
            for (key, membership) in scenario.ledger.state().memberships().iter() {
                if membership.is_member() {
                    *per_channel.entry(key.channel).or_default() += 1;
                    *per_user.entry(key.subscriber).or_default() += 1;
                }
            }

            for channel in scenario.ledger.state().channels().iter() {
                prop_assert_eq!(
                    channel.member_count,
                    per_channel.get(&channel.owner).copied().unwrap_or(0)
                );
            }
            for i in 0..scenario.ledger.users_count() {
                let (address, user) = scenario.ledger.user_at(i).unwrap();
                prop_assert_eq!(
                    user.subscribed_count,
                    per_user.get(address).copied().unwrap_or(0)
                );
            }
        }

        #[test]
        fn test_accumulators_are_monotonic(ops in ops(2, 4, 60)) {
            let mut scenario = Scenario::new(2, 4);

            for op in &ops {
                let before: Vec<_> = (0..2)
                    .map(|i| scenario.ledger.channel(&scenario.channel(i)).unwrap().fair_share)
                    .collect();
                let group_before = *scenario.ledger.channel_group();

                let _ = scenario.apply(op);

                for (i, prev) in before.iter().enumerate() {
                    let now = scenario.ledger.channel(&scenario.channel(i)).unwrap().fair_share;
                    prop_assert!(now.historical_z >= prev.historical_z);
                    prop_assert!(now.last_update >= prev.last_update);
                }
                let group = scenario.ledger.channel_group();
                prop_assert!(group.historical_z >= group_before.historical_z);
                prop_assert!(group.last_update >= group_before.last_update);
            }
        }

        #[test]
        fn test_rejections_leave_state_unchanged(ops in ops(2, 4, 60)) {
            let mut scenario = Scenario::new(2, 4);

            for op in &ops {
                let before = scenario.ledger.state().clone();
                if scenario.apply(op).is_err() {
                    prop_assert_eq!(scenario.ledger.state(), &before);
                }
            }
        }
    }

    #[test]
    fn test_owner_can_never_leave() {
        let mut scenario = Scenario::new(1, 1);
        let err = scenario.apply(&Op::UnsubscribeOwner { channel: 0 }).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidUnsubscribe { .. }));
    }
}
