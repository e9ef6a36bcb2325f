//! # Herald Testkit
//!
//! Testing utilities for Herald.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: deterministic parties and ledgers wired to in-memory
//!   collaborators
//! - **Generators**: Proptest strategies over operation sequences
//! - **Golden vectors**: Known weights and fair shares with expected outputs
//!
//! ## Golden Vectors
//!
//! ```rust
//! use herald_testkit::vectors::verify_all_vectors;
//!
//! verify_all_vectors().unwrap();
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use herald_testkit::fixtures::{TestFixture, TestParty};
//!
//! let fixture = TestFixture::new();
//! let mut ledger = fixture.ledger();
//! let alice = TestParty::from_seed([1; 32]);
//!
//! fixture.open_channel(&mut ledger, alice.address).unwrap();
//! assert_eq!(ledger.channels_count(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_party, TestFixture, TestParty};
pub use generators::{Op, Scenario};
pub use vectors::{verify_all_vectors, ChannelShareVector, SubscriberShareVector, WeightVector};
