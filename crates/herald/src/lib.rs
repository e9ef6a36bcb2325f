//! # Herald
//!
//! A channel and subscription ledger with time-weighted fair-share
//! accounting, served behind one async entry point.
//!
//! ## Overview
//!
//! - **Channels** stake a contribution into a yield-bearing pool and are
//!   weighted by it
//! - **Subscribers** join and leave channels; leaving graylists the pair
//! - **Fair shares** of channels and subscribers are answered in constant time
//! - **Events** emitted by every operation are journaled in a [`store::Store`],
//!   and ledger state is snapshotted so the service can be reopened
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use herald::{Herald, HeraldConfig};
//! use herald::ledger::Capabilities;
//! use herald::store::SqliteStore;
//!
//! async fn example(caps: Capabilities) {
//!     let store = Arc::new(SqliteStore::open("herald.db").unwrap());
//!     let herald = Herald::open(store, caps, HeraldConfig::default(), 0)
//!         .await
//!         .unwrap();
//!
//!     println!("{} channels", herald.channels_count().await);
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `herald::core` - Primitives and the fair-share accumulators
//! - `herald::ledger` - The ledger engine and capability traits
//! - `herald::store` - Journal and snapshot storage

pub mod config;
pub mod error;
pub mod service;

pub use herald_core as core;
pub use herald_ledger as ledger;
pub use herald_store as store;

pub use config::HeraldConfig;
pub use error::{HeraldError, Result};
pub use service::Herald;

pub use herald_core::{
    Address, Amount, Channel, ChannelType, Event, Height, Membership, MembershipState, PublicKey,
    User,
};
