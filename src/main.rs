use clap::Parser;
use identity_core::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Bootstrap => cli::bootstrap::run().await,
        Command::HashPassword(args) => cli::hash_password::run(args),
        Command::ShowConfig => cli::show_config::run(),
    }
}
