//! # Herald Core
//!
//! Pure primitives for the Herald membership and reward-accounting ledger.
//!
//! This crate contains no I/O, no storage, no collaborators. It is pure
//! computation over the ledger's record shapes.
//!
//! ## Key Types
//!
//! - [`Address`] - 20-byte account identifier (channel owners, subscribers)
//! - [`Channel`] - A staked channel record, keyed by owner
//! - [`User`] - A subscriber record, created lazily on first interaction
//! - [`Membership`] - The state of one (channel, subscriber) pair
//! - [`Event`] - Append-only notifications emitted by ledger operations
//!
//! ## Fair Share
//!
//! Time-weighted shares are tracked with constant-time accumulators, see the
//! [`fairshare`] module. All ratios are scaled by [`ADJUST_FOR_FLOAT`].

pub mod channel;
pub mod error;
pub mod event;
pub mod fairshare;
pub mod math;
pub mod membership;
pub mod types;
pub mod user;

pub use channel::{Channel, ChannelType};
pub use error::{AddressError, MathError};
pub use event::Event;
pub use fairshare::{Accumulator, ChannelGroup, MemberAction};
pub use math::{channel_weight, scaled_ratio, ADJUST_FOR_FLOAT};
pub use membership::{Membership, MembershipKey, MembershipState};
pub use types::{Address, Amount, Height, PublicKey};
pub use user::User;
