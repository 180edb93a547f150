//! Acquisition criteria measuring the expected gain of sampling
//! candidate points, given the current best observed value.

mod ei;
mod qei;

pub use ei::*;
pub use qei::*;
