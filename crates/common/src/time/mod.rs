//! Time abstractions
//!
//! Scheduling decisions take `now` from a [`Clock`] so tests can drive them
//! with a [`MockClock`] instead of waiting on the wall clock.

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
