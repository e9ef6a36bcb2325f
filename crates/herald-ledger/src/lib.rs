//! # Herald Ledger
//!
//! The channel and subscription ledger: registries, membership transitions,
//! pool and fee bookkeeping, and fair-share queries.
//!
//! ## Atomicity
//!
//! Every operation stages its changes in a transaction overlay and commits
//! them in one step after all preconditions and collaborator calls succeed.
//! A rejected operation leaves the ledger unchanged and emits nothing.
//!
//! Callers that must persist events before committing use
//! [`Ledger::prepare`], then [`Ledger::commit`] or [`Ledger::abort`].
//!
//! ## Collaborators
//!
//! Asset movement, the yield vault, the channelization allow-list, and key
//! verification are injected as [`Capabilities`]. See
//! [`capabilities::memory`] for in-memory implementations.

pub mod capabilities;
pub mod channels;
pub mod config;
pub mod error;
pub mod ledger;
pub mod membership;
pub mod operation;
pub mod pool;
pub mod state;
mod txn;
pub mod users;

pub use capabilities::{
    AllowList, AssetLedger, Capabilities, DerivedKeyVerifier, KeyVerifier, YieldVault,
};
pub use channels::ChannelRegistry;
pub use config::LedgerConfig;
pub use error::{CapabilityError, LedgerError, Result};
pub use ledger::{Ledger, Staged};
pub use membership::MembershipTable;
pub use operation::Operation;
pub use pool::{FeeLedger, PoolLedger};
pub use state::LedgerState;
pub use users::UserRegistry;
