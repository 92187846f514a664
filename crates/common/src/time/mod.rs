//! Time utilities
//!
//! - **[`clock`]**: real and mock clocks behind the [`Clock`] trait

pub mod clock;

pub use clock::{Clock, MockClock, SystemClock};
