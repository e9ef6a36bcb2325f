//! Notifications emitted by ledger operations.
//!
//! Events are append-only and consumed by off-ledger observers. A rejected
//! operation emits nothing.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::channel::ChannelType;
use crate::types::{Address, PublicKey};

/// A ledger notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    ChannelAdded {
        owner: Address,
        channel_type: ChannelType,
        metadata: Bytes,
    },
    ChannelMetadataUpdated {
        owner: Address,
        metadata: Bytes,
    },
    ChannelDeactivated {
        owner: Address,
    },
    Subscribed {
        channel: Address,
        subscriber: Address,
    },
    Unsubscribed {
        channel: Address,
        subscriber: Address,
    },
    PublicKeyRegistered {
        address: Address,
        public_key: PublicKey,
    },
}

impl Event {
    /// Stable name of the event kind.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChannelAdded { .. } => "ChannelAdded",
            Self::ChannelMetadataUpdated { .. } => "ChannelMetadataUpdated",
            Self::ChannelDeactivated { .. } => "ChannelDeactivated",
            Self::Subscribed { .. } => "Subscribed",
            Self::Unsubscribed { .. } => "Unsubscribed",
            Self::PublicKeyRegistered { .. } => "PublicKeyRegistered",
        }
    }
}
