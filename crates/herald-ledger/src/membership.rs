//! Membership table and the subscribe / unsubscribe transitions.

use std::collections::BTreeMap;

use herald_core::{Address, Event, MemberAction, Membership, MembershipKey, MembershipState};
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};
use crate::state::entries;
use crate::txn::Txn;

/// Every (channel, subscriber) pair that ever subscribed. Entries are never
/// removed; absent pairs read as `NonMember`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTable {
    #[serde(with = "entries")]
    entries: BTreeMap<MembershipKey, Membership>,
}

impl MembershipTable {
    pub fn get(&self, channel: Address, subscriber: Address) -> Membership {
        self.entries
            .get(&MembershipKey::new(channel, subscriber))
            .copied()
            .unwrap_or_default()
    }

    /// All recorded pairs, ordered by channel then subscriber.
    pub fn iter(&self) -> impl Iterator<Item = (&MembershipKey, &Membership)> {
        self.entries.iter()
    }

    /// Number of pairs with any recorded history.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn put(&mut self, key: MembershipKey, membership: Membership) {
        self.entries.insert(key, membership);
    }
}

impl Txn<'_> {
    /// Check a subscription is possible, with or without the graylist.
    pub(crate) fn check_subscribe(
        &self,
        channel: Address,
        subscriber: Address,
        honor_graylist: bool,
    ) -> Result<()> {
        if !self.channel(&channel).is_some_and(|c| c.is_active()) {
            return Err(LedgerError::ChannelInactive(channel));
        }
        match self.membership(channel, subscriber).state {
            MembershipState::Member => Err(LedgerError::AlreadyMember {
                channel,
                subscriber,
            }),
            MembershipState::Graylisted if honor_graylist => Err(LedgerError::Graylisted {
                channel,
                subscriber,
            }),
            _ => Ok(()),
        }
    }

    /// Stage `subscriber` joining `channel`. Preconditions are the caller's
    /// concern.
    pub(crate) fn add_member(&mut self, channel: Address, subscriber: Address) -> Result<()> {
        let at = self.at();

        let record = self
            .channel_mut(&channel)
            .ok_or(LedgerError::NoSuchChannel(channel))?;
        record.fair_share = record.fair_share.rolled(MemberAction::Added, at)?;
        record.member_count = record.member_count.saturating_add(1);

        let user = self.activate_user(subscriber);
        user.subscribed_count = user.subscribed_count.saturating_add(1);

        self.set_membership(channel, subscriber, Membership::member(at));
        self.emit(Event::Subscribed {
            channel,
            subscriber,
        });
        Ok(())
    }

    /// Stage `subscriber` leaving `channel`.
    pub(crate) fn remove_member(&mut self, channel: Address, subscriber: Address) -> Result<()> {
        let at = self.at();

        let owner = self
            .channel(&channel)
            .map(|record| record.owner)
            .ok_or(LedgerError::NoSuchChannel(channel))?;
        let membership = self.membership(channel, subscriber);
        if subscriber == owner || !membership.is_member() {
            return Err(LedgerError::InvalidUnsubscribe {
                channel,
                subscriber,
            });
        }

        let record = self
            .channel_mut(&channel)
            .ok_or(LedgerError::NoSuchChannel(channel))?;
        record.fair_share = record.fair_share.rolled(MemberAction::Removed, at)?;
        record.member_count = record.member_count.saturating_sub(1);

        if let Some(user) = self.user_mut(&subscriber) {
            user.subscribed_count = user.subscribed_count.saturating_sub(1);
        }

        self.set_membership(
            channel,
            subscriber,
            Membership {
                state: MembershipState::Graylisted,
                ..membership
            },
        );
        self.emit(Event::Unsubscribed {
            channel,
            subscriber,
        });
        Ok(())
    }
}
