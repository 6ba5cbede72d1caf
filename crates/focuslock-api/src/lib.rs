//! Protocol types for focuslockd IPC
//!
//! This crate defines the stable API between focuslockd and its clients:
//! - Commands (requests from clients: foreground reports, admin writes)
//! - Responses
//! - Events (service -> clients), including presentation commands
//! - Shared decision and session types used by the enforcement core

mod commands;
mod events;
mod types;

pub use commands::*;
pub use events::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
