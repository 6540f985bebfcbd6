//! Timezone bot CLI library.
//!
//! Wires the core engine and the SQLite directory to the chat-message
//! and registration boundaries, plus a CLI to drive both.

mod cli;
pub mod commands;
mod config;
pub mod message;

pub use cli::{Cli, Commands, LinkAction};
pub use config::Config;
