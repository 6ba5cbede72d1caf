//! Presentation-layer interface for focuslockd
//!
//! This crate defines the commands the enforcement core sends to whatever
//! renders the blocking overlay. It contains no rendering code itself.

mod mock;
mod traits;

pub use mock::*;
pub use traits::*;
