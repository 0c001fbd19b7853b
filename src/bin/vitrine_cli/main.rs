//! vitrine-cli: on-demand revalidation and cache inspection client.
#![deny(clippy::all, clippy::pedantic)]

mod args;
mod client;
mod handlers;

use clap::Parser;

use args::{Cli, Commands};
use client::{CliError, build_ctx_from_cli};

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = build_ctx_from_cli(&cli)?;

    match cli.command {
        Commands::Revalidate(cmd) => {
            handlers::revalidate(&ctx, cmd.action).await?;
        }
        Commands::Status => {
            handlers::status(&ctx).await?;
        }
        Commands::Health => {
            handlers::health(&ctx).await?;
        }
    }

    Ok(())
}
