//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Community timezone bot.
///
/// Keeps a durable registry of member timezones and answers "what time
/// is X for everyone" queries with a DST-aware multi-timezone report.
#[derive(Debug, Parser)]
#[command(name = "tzb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Community the command applies to (defaults from config).
    #[arg(short = 'C', long, global = true)]
    pub community: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register a member's timezone.
    Register {
        /// The member to register.
        #[arg(long)]
        member: String,

        /// IANA timezone identifier (e.g. America/New_York).
        #[arg(long)]
        zone: String,
    },

    /// Remove a member's registration.
    Unregister {
        #[arg(long)]
        member: String,
    },

    /// Show a member's registered timezone.
    Lookup {
        #[arg(long)]
        member: String,
    },

    /// List registered members in registration order.
    Members,

    /// Convert a time expression into every member's local time.
    When {
        /// The requesting member (their zone is the default source).
        #[arg(long)]
        member: String,

        /// The time expression, e.g. "3:30pm" or "noon friday UTC".
        expression: String,

        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Feed a raw chat message through the full bot pipeline.
    Message {
        /// The message author.
        #[arg(long)]
        member: String,

        /// The raw message text; time expressions go in <angle brackets>.
        text: String,
    },

    /// Registration-link operations (the web form boundary).
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },
}

/// Registration-link subcommands.
#[derive(Debug, Subcommand)]
pub enum LinkAction {
    /// Issue a registration link for a member.
    Issue {
        #[arg(long)]
        member: String,
    },

    /// Claim a link with a timezone, as the web form would.
    Claim {
        #[arg(long)]
        token: String,

        #[arg(long)]
        zone: String,
    },
}
