//! CLI module for Identity Core
//!
//! Operator subcommands:
//! - `bootstrap`: wire the state, seed the system catalog and report
//! - `hash-password`: print an Argon2 hash for a password
//! - `show-config`: print the effective configuration as JSON

pub mod bootstrap;
pub mod hash_password;
pub mod show_config;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Identity Core - accounts, roles, permissions and sessions
#[derive(Parser)]
#[command(name = "identity-core")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Seed the system catalog and the initial admin account
    Bootstrap,

    /// Print an Argon2 hash of a password
    HashPassword(hash_password::HashPasswordArgs),

    /// Print the effective configuration (secrets omitted)
    ShowConfig,
}

/// Load `.env`, the layered configuration and install logging
pub(crate) fn load_config() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);
    Ok(config)
}
