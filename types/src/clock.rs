//! Time source abstraction.
//!
//! The registry never reads the wall clock directly; it asks a [`Clock`].
//! Production uses [`SystemClock`], tests swap in a deterministic clock.

use crate::Timestamp;

/// Supplies `currentTime()` to the registry.
///
/// Implementations must be monotonically non-decreasing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
