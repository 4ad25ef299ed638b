#![warn(missing_docs)]

//! This crate constitutes a library of light weight helpers that are shared
//! across the other warden crates: cross-target bounds, a shared
//! reader-writer cell and an injectable clock.

mod sync;
pub use sync::*;

pub mod time;
pub use time::{Clock, FixedClock, SystemClock};
