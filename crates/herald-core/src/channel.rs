//! Channel records.
//!
//! A channel is identified by its owner's address. Every variant shares one
//! record shape; the variant is a tag.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::fairshare::Accumulator;
use crate::types::{Address, Amount, Height};

/// Discriminator for how a channel was funded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ChannelType {
    Unknown = 0,
    /// Protocol-created channel advertising the protocol itself.
    Promoter = 1,
    /// Channel whose stake earns yield in the pool.
    InterestBearing = 2,
    /// Reserved for protocol channels; never creatable by the public.
    NoFees = 3,
}

impl ChannelType {
    /// Convert from the wire discriminant.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Unknown),
            1 => Some(Self::Promoter),
            2 => Some(Self::InterestBearing),
            3 => Some(Self::NoFees),
            _ => None,
        }
    }

    /// The wire discriminant.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Whether a member of the public may create a channel of this type.
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Promoter | Self::InterestBearing)
    }
}

/// A registered channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub owner: Address,
    pub channel_type: ChannelType,
    /// Terminal once set.
    pub deactivated: bool,
    /// Last metadata published by the owner.
    pub metadata: Bytes,
    /// Principal staked into the pool at creation.
    pub pool_contribution: Amount,
    /// Active subscriptions, the owner included.
    pub member_count: u64,
    /// `pool_contribution * ADJUST_FOR_FLOAT / min_contribution`, fixed at creation.
    pub channel_weight: u128,
    pub start_block: Height,
    pub update_block: Height,
    /// Subscriber-level accumulator for this channel.
    pub fair_share: Accumulator,
}

impl Channel {
    /// A fresh channel with no members yet.
    pub fn new(
        owner: Address,
        channel_type: ChannelType,
        metadata: Bytes,
        pool_contribution: Amount,
        channel_weight: u128,
        at: Height,
    ) -> Self {
        Self {
            owner,
            channel_type,
            deactivated: false,
            metadata,
            pool_contribution,
            member_count: 0,
            channel_weight,
            start_block: at,
            update_block: at,
            fair_share: Accumulator::new(at),
        }
    }

    /// Whether the channel accepts new subscriptions.
    pub fn is_active(&self) -> bool {
        !self.deactivated
    }

    /// Whether anyone besides the owner is subscribed.
    pub fn has_external_subscribers(&self) -> bool {
        self.member_count > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_type_discriminants() {
        for v in 0..=3u8 {
            let ty = ChannelType::from_u8(v).unwrap();
            assert_eq!(ty.as_u8(), v);
        }
        assert_eq!(ChannelType::from_u8(4), None);
    }

    #[test]
    fn test_public_types() {
        assert!(ChannelType::Promoter.is_public());
        assert!(ChannelType::InterestBearing.is_public());
        assert!(!ChannelType::NoFees.is_public());
        assert!(!ChannelType::Unknown.is_public());
    }

    #[test]
    fn test_new_channel_has_no_members() {
        let ch = Channel::new(
            Address::from_bytes([1; 20]),
            ChannelType::InterestBearing,
            Bytes::from_static(b"meta"),
            50,
            10_000_000,
            42,
        );
        assert!(ch.is_active());
        assert_eq!(ch.member_count, 0);
        assert_eq!(ch.start_block, 42);
        assert_eq!(ch.update_block, 42);
        assert_eq!(ch.fair_share, Accumulator::new(42));
        assert!(!ch.has_external_subscribers());
    }
}
