#![warn(missing_docs)]

//! This crate constitutes a library of light weight helpers that are shared
//! across the lectern crates: a swappable clock and inclusive validity
//! windows over UTC instants.

pub mod time;
pub use time::*;

pub mod window;
pub use window::*;
