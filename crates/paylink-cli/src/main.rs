//! Paylink CLI

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

mod config;
mod env_vars;
mod sub_commands;

/// Create, split, preview and pay payment links
#[derive(Parser)]
#[command(name = "paylink-cli")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Logging level
    #[arg(short, long, default_value = "error")]
    log_level: Level,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a payment link
    CreateRequest(sub_commands::create_request::CreateRequestSubCommand),
    /// Split a total into payment links
    Split(sub_commands::split::SplitSubCommand),
    /// Decode a payment link
    DecodeRequest(sub_commands::decode_request::DecodeRequestSubCommand),
    /// Show the preview metadata of a payment link
    Preview(sub_commands::preview::PreviewSubCommand),
    /// Pay a payment link against the in-memory demo ledger
    Pay(sub_commands::pay::PaySubCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Cli = Cli::parse();
    let default_filter = args.log_level;

    let env_filter = EnvFilter::new(format!("{default_filter}"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::new(args.config.clone()).from_env()?;
    tracing::debug!("Link origin {}", settings.link.origin);

    match &args.command {
        Commands::CreateRequest(sub_command_args) => {
            sub_commands::create_request::create_request(&settings, sub_command_args)
        }
        Commands::Split(sub_command_args) => {
            sub_commands::split::split(&settings, sub_command_args)
        }
        Commands::DecodeRequest(sub_command_args) => {
            sub_commands::decode_request::decode_request(sub_command_args)
        }
        Commands::Preview(sub_command_args) => sub_commands::preview::preview(sub_command_args),
        Commands::Pay(sub_command_args) => {
            sub_commands::pay::pay(&settings, sub_command_args).await
        }
    }
}
