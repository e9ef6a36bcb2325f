//! Committed ledger state and the write sets that modify it.
//!
//! Operations never mutate [`LedgerState`] directly. They stage changes in a
//! [`WriteSet`] through a transaction, and the ledger applies the write set in
//! one infallible step once every precondition and collaborator call has
//! succeeded.

use std::collections::BTreeMap;

use herald_core::{
    Address, Channel, ChannelGroup, Event, Height, Membership, MembershipKey, User,
};
use serde::{Deserialize, Serialize};

use crate::channels::ChannelRegistry;
use crate::membership::MembershipTable;
use crate::pool::{FeeLedger, PoolLedger, Settlement};
use crate::users::UserRegistry;

/// Everything the ledger owns. Serializable for snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    pub(crate) channels: ChannelRegistry,
    pub(crate) users: UserRegistry,
    pub(crate) memberships: MembershipTable,
    pub(crate) group: ChannelGroup,
    pub(crate) pool: PoolLedger,
    pub(crate) fees: FeeLedger,
    /// Height of the last committed operation.
    pub(crate) last_height: Height,
}

impl LedgerState {
    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub fn memberships(&self) -> &MembershipTable {
        &self.memberships
    }

    pub fn group(&self) -> &ChannelGroup {
        &self.group
    }

    pub fn pool(&self) -> &PoolLedger {
        &self.pool
    }

    pub fn fees(&self) -> &FeeLedger {
        &self.fees
    }

    pub fn last_height(&self) -> Height {
        self.last_height
    }

    /// Commit a write set staged at `at`, returning its events.
    pub(crate) fn apply(&mut self, writes: WriteSet, at: Height) -> Vec<Event> {
        let WriteSet {
            channels,
            new_channels,
            users,
            new_users,
            memberships,
            group,
            pool,
            fees,
            events,
            settlements: _,
        } = writes;

        for (owner, channel) in channels {
            self.channels.put(owner, channel);
        }
        self.channels.extend_order(new_channels);

        for (address, user) in users {
            self.users.put(address, user);
        }
        self.users.extend_order(new_users);

        for (key, membership) in memberships {
            self.memberships.put(key, membership);
        }

        if let Some(group) = group {
            self.group = group;
        }
        if let Some(pool) = pool {
            self.pool = pool;
        }
        if let Some(fees) = fees {
            self.fees = fees;
        }

        self.last_height = at;
        events
    }
}

/// Changes staged by one operation.
#[derive(Debug, Default)]
pub(crate) struct WriteSet {
    pub(crate) channels: BTreeMap<Address, Channel>,
    /// Channels created by this operation, in creation order.
    pub(crate) new_channels: Vec<Address>,
    pub(crate) users: BTreeMap<Address, User>,
    /// Users activated by this operation, in activation order.
    pub(crate) new_users: Vec<Address>,
    pub(crate) memberships: BTreeMap<MembershipKey, Membership>,
    pub(crate) group: Option<ChannelGroup>,
    pub(crate) pool: Option<PoolLedger>,
    pub(crate) fees: Option<FeeLedger>,
    pub(crate) events: Vec<Event>,
    /// Asset movements already made, in order.
    pub(crate) settlements: Vec<Settlement>,
}

/// Serialize a map as a sequence of pairs.
///
/// Keys here are structs or byte arrays, which not every format accepts as
/// map keys.
pub(crate) mod entries {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
