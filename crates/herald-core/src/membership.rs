//! Channel membership.
//!
//! Each (channel, subscriber) pair moves through
//! `NonMember -> Member -> Graylisted`, and back to `Member` on subscribe.
//! Entries are never deleted.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Height};

/// Key of the membership table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MembershipKey {
    pub channel: Address,
    pub subscriber: Address,
}

impl MembershipKey {
    pub const fn new(channel: Address, subscriber: Address) -> Self {
        Self {
            channel,
            subscriber,
        }
    }
}

/// Lifecycle state of a membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MembershipState {
    #[default]
    NonMember,
    Member,
    /// Voluntarily unsubscribed. Blocks delegated re-subscription.
    Graylisted,
}

/// A membership entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub state: MembershipState,
    /// Height of the subscriber's last join, used by share queries.
    pub member_last_update: Height,
}

impl Membership {
    /// A live membership starting at `at`.
    pub const fn member(at: Height) -> Self {
        Self {
            state: MembershipState::Member,
            member_last_update: at,
        }
    }

    pub fn is_member(&self) -> bool {
        self.state == MembershipState::Member
    }

    pub fn is_graylisted(&self) -> bool {
        self.state == MembershipState::Graylisted
    }
}
