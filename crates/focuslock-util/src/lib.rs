//! Shared utilities for focuslockd
//!
//! This crate provides:
//! - ID types (AppId, ClientId)
//! - Time utilities (wall clock with mock support, injectable clocks)
//! - Default paths for socket, data, and config files

mod ids;
mod paths;
mod time;

pub use ids::*;
pub use paths::*;
pub use time::*;
