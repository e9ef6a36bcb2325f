//! Subscriber records.

use serde::{Deserialize, Serialize};

use crate::types::{Height, PublicKey};

/// A user of the protocol, created lazily on first interaction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Set on first subscribe, key broadcast, or channel creation.
    pub activated: bool,
    /// Whether this address owns a channel.
    pub channellized: bool,
    /// Height at activation.
    pub start_block: Height,
    /// Channels currently subscribed to.
    pub subscribed_count: u64,
    /// Registered public key. One-way latch.
    pub public_key: Option<PublicKey>,
}

impl User {
    /// An activated user with no subscriptions.
    pub fn activated_at(at: Height) -> Self {
        Self {
            activated: true,
            start_block: at,
            ..Self::default()
        }
    }

    /// Whether a public key has been registered.
    pub fn public_key_registered(&self) -> bool {
        self.public_key.is_some()
    }
}
