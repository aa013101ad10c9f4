//! Tribe Runtime
//!
//! Wires the scoring engine, the compatibility cache and an external
//! profile store into the [`Matcher`].

pub mod store;
pub mod config;
pub mod matcher;

pub use store::*;
pub use config::*;
pub use matcher::*;
