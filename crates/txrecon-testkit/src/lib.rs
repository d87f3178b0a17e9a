//! # txrecon Testkit
//!
//! Testing utilities for the txrecon tracker.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Stub hashers**: a seeded [`KeyedHasher`](txrecon_core::KeyedHasher)
//!   so every hash-derived decision is reproducible
//! - **Fixtures**: [`TrackerFixture`] for one-line tracker setup and bulk
//!   peer registration
//! - **Generators**: proptest strategies for ids, directions, and salts
//!
//! ## Example
//!
//! ```rust
//! use txrecon_core::Direction;
//! use txrecon_testkit::TrackerFixture;
//!
//! let fixture = TrackerFixture::with_seed(42);
//! let peers = fixture.register_many(10, Direction::Inbound);
//! assert!(fixture.tracker.is_peer_registered(peers[0]));
//! ```

pub mod fixtures;
pub mod generators;
pub mod hashers;

pub use fixtures::{init_tracing, TrackerFixture};
pub use hashers::StubHasher;
