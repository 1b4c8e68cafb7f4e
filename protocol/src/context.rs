//! # Call Context
//!
//! Who is calling, and when. Read once at the start of an operation and
//! carried through it, so every decision inside one call sees the same
//! instant.

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::types::{Address, Timestamp};

/// The caller and timestamp an operation executes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The account invoking the operation.
    pub caller: Address,
    /// The instant the operation executes at.
    pub now: Timestamp,
}

impl CallContext {
    /// Creates a context for `caller` at `now`.
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// Creates a context for `caller`, sampling `clock` once.
    pub fn from_clock(caller: Address, clock: &dyn Clock) -> Self {
        Self::new(caller, clock.now())
    }

    /// Same instant, different caller.
    pub fn with_caller(self, caller: Address) -> Self {
        Self { caller, ..self }
    }

    /// Same caller, different instant.
    pub fn at(self, now: Timestamp) -> Self {
        Self { now, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn context_samples_clock_once() {
        let clock = ManualClock::new(42);
        let alice = Address::from_label("alice");
        let ctx = CallContext::from_clock(alice, &clock);
        clock.advance(100);
        assert_eq!(ctx.now, 42);
        assert_eq!(ctx.caller, alice);
    }

    #[test]
    fn builders_replace_one_field() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let ctx = CallContext::new(alice, 10);
        assert_eq!(ctx.with_caller(bob), CallContext::new(bob, 10));
        assert_eq!(ctx.at(20), CallContext::new(alice, 20));
    }
}
