//! Mutating operations as values.
//!
//! [`Ledger::prepare`](crate::Ledger::prepare) stages an [`Operation`] without
//! committing it, so a caller can persist the resulting events first.

use bytes::Bytes;
use herald_core::{Address, Amount, ChannelType, PublicKey};
use serde::{Deserialize, Serialize};

/// A mutating ledger operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    CreateChannel {
        owner: Address,
        channel_type: ChannelType,
        metadata: Bytes,
        contribution: Amount,
    },
    CreateChannelWithPublicKey {
        owner: Address,
        public_key: PublicKey,
        channel_type: ChannelType,
        metadata: Bytes,
        contribution: Amount,
    },
    CreatePromoterChannel {
        payer: Address,
    },
    DeactivateChannel {
        caller: Address,
    },
    UpdateMetadata {
        caller: Address,
        metadata: Bytes,
    },
    Subscribe {
        channel: Address,
        subscriber: Address,
    },
    SubscribeWithPublicKey {
        channel: Address,
        subscriber: Address,
        public_key: PublicKey,
    },
    /// Subscribe to the caller's channel, charging the caller the delegation
    /// fee.
    SubscribeDelegated {
        caller: Address,
        subscriber: Address,
    },
    SubscribeWithPublicKeyDelegated {
        caller: Address,
        subscriber: Address,
        public_key: PublicKey,
    },
    Unsubscribe {
        channel: Address,
        subscriber: Address,
    },
    BroadcastPublicKey {
        address: Address,
        public_key: PublicKey,
    },
}

impl Operation {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateChannel { .. } => "create_channel",
            Self::CreateChannelWithPublicKey { .. } => "create_channel_with_public_key",
            Self::CreatePromoterChannel { .. } => "create_promoter_channel",
            Self::DeactivateChannel { .. } => "deactivate_channel",
            Self::UpdateMetadata { .. } => "update_metadata",
            Self::Subscribe { .. } => "subscribe",
            Self::SubscribeWithPublicKey { .. } => "subscribe_with_public_key",
            Self::SubscribeDelegated { .. } => "subscribe_delegated",
            Self::SubscribeWithPublicKeyDelegated { .. } => "subscribe_with_public_key_delegated",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::BroadcastPublicKey { .. } => "broadcast_public_key",
        }
    }
}
