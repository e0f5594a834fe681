//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! External dependencies of the registry (today: the clock) are abstracted
//! behind traits. This crate provides test-friendly implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the system clock
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;

pub use clock::NullClock;
