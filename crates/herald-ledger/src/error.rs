//! Error types for the ledger.

use herald_core::{Address, Amount, ChannelType, Height, MathError};
use thiserror::Error;

/// Errors reported by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The payer cannot cover the transfer.
    #[error("insufficient funds: {payer} holds {available}, needs {needed}")]
    InsufficientFunds {
        payer: Address,
        needed: Amount,
        available: Amount,
    },

    /// The yield vault refused the deposit.
    #[error("vault rejected deposit: {0}")]
    VaultRejected(String),

    /// Lock poisoned or backend unreachable.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Precondition violations and failures of ledger operations.
///
/// A rejected operation leaves the ledger unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("user not in channelization whitelist: {0}")]
    NotWhitelisted(Address),

    #[error("channel type invalid: {0:?}")]
    InvalidChannelType(ChannelType),

    #[error("user already a channel owner: {0}")]
    AlreadyChannelOwner(Address),

    #[error("insufficient funds or max ceiling reached: {amount} not in [{min}, {max}]")]
    ContributionOutOfRange {
        amount: Amount,
        min: Amount,
        max: Amount,
    },

    #[error("channel doesn't exist: {0}")]
    NoSuchChannel(Address),

    #[error("channel deactivated or doesn't exist: {0}")]
    ChannelInactive(Address),

    #[error("subscriber already exists: {subscriber} in {channel}")]
    AlreadyMember {
        channel: Address,
        subscriber: Address,
    },

    #[error("either channel owner or not subscribed: {subscriber} in {channel}")]
    InvalidUnsubscribe {
        channel: Address,
        subscriber: Address,
    },

    #[error("not subscribed: {subscriber} in {channel}")]
    NotSubscribed {
        channel: Address,
        subscriber: Address,
    },

    #[error("channel is graylisted: {subscriber} in {channel}")]
    Graylisted {
        channel: Address,
        subscriber: Address,
    },

    #[error("public key validation failed for {0}")]
    KeyMismatch(Address),

    #[error("protocol already has a promoter channel")]
    AlreadyPromoterChannel,

    #[error("channel has external subscribers: {0}")]
    MetadataLockedBySubscribers(Address),

    #[error("stale height: last committed {last}, got {got}")]
    StaleHeight { last: Height, got: Height },

    /// Another operation committed after this one was staged.
    #[error("staged operation superseded by a later commit")]
    Superseded,

    #[error("invalid ledger config: {0}")]
    InvalidConfig(String),

    #[error("math error: {0}")]
    Math(#[from] MathError),

    #[error("capability error: {0}")]
    Capability(#[from] CapabilityError),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;
