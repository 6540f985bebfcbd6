use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tzb_bot::commands::{link, lookup, members, message, register, unregister, when};
use tzb_bot::{Cli, Commands, Config, LinkAction};
use tzb_core::{CommunityId, MemberId, TimezoneDirectory};

/// Load config and open the directory, ensuring the data directory exists.
fn open_directory(
    config_path: Option<&Path>,
) -> Result<(TimezoneDirectory<tzb_db::Database>, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tzb_db::Database::open(&config.database_path).context("failed to open database")?;
    let directory = TimezoneDirectory::with_link_timeout(db, config.link_timeout_minutes);
    Ok((directory, config))
}

fn community_id(cli: &Cli, config: &Config) -> Result<CommunityId> {
    let name = cli
        .community
        .clone()
        .unwrap_or_else(|| config.default_community.clone());
    CommunityId::new(name).context("invalid community ID")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let mut stdout = std::io::stdout().lock();
    let now = Utc::now();

    match &cli.command {
        Some(Commands::Register { member, zone }) => {
            let (mut directory, config) = open_directory(cli.config.as_deref())?;
            let community = community_id(&cli, &config)?;
            let member = MemberId::new(member.clone()).context("invalid member ID")?;
            register::run(&mut stdout, &mut directory, &member, &community, zone, now)?;
        }
        Some(Commands::Unregister { member }) => {
            let (mut directory, config) = open_directory(cli.config.as_deref())?;
            let community = community_id(&cli, &config)?;
            let member = MemberId::new(member.clone()).context("invalid member ID")?;
            unregister::run(&mut stdout, &mut directory, &member, &community)?;
        }
        Some(Commands::Lookup { member }) => {
            let (directory, config) = open_directory(cli.config.as_deref())?;
            let community = community_id(&cli, &config)?;
            let member = MemberId::new(member.clone()).context("invalid member ID")?;
            lookup::run(&mut stdout, &directory, &member, &community)?;
        }
        Some(Commands::Members) => {
            let (directory, config) = open_directory(cli.config.as_deref())?;
            let community = community_id(&cli, &config)?;
            members::run(&mut stdout, &directory, &community)?;
        }
        Some(Commands::When {
            member,
            expression,
            json,
        }) => {
            let (directory, config) = open_directory(cli.config.as_deref())?;
            let community = community_id(&cli, &config)?;
            let member = MemberId::new(member.clone()).context("invalid member ID")?;
            let fallback = config.fallback_zone()?;
            when::run(
                &mut stdout,
                &directory,
                &member,
                &community,
                expression,
                *json,
                now,
                fallback,
            )?;
        }
        Some(Commands::Message { member, text }) => {
            let (mut directory, config) = open_directory(cli.config.as_deref())?;
            let community = community_id(&cli, &config)?;
            let member = MemberId::new(member.clone()).context("invalid member ID")?;
            let fallback = config.fallback_zone()?;
            message::run(
                &mut stdout,
                &mut directory,
                &member,
                &community,
                text,
                now,
                fallback,
            )?;
        }
        Some(Commands::Link { action }) => {
            let (mut directory, config) = open_directory(cli.config.as_deref())?;
            match action {
                LinkAction::Issue { member } => {
                    let community = community_id(&cli, &config)?;
                    let member = MemberId::new(member.clone()).context("invalid member ID")?;
                    link::issue(&mut stdout, &mut directory, &member, &community, now)?;
                }
                LinkAction::Claim { token, zone } => {
                    link::claim(&mut stdout, &mut directory, token, zone, now)?;
                }
            }
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
