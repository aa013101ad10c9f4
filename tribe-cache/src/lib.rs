//! Tribe Cache
//!
//! Advisory caching for compatibility results:
//! - Pluggable cache client (in-memory `DashMap` client included)
//! - Deterministic key derivation with subject-prefix invalidation
//! - Bounded, failure-tolerant typed access: every error is a miss

pub mod client;
pub mod keys;
pub mod cache;

pub use client::*;
pub use keys::*;
pub use cache::*;
