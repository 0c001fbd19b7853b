//! Command-line surface for `vitrine-cli`.

#![deny(clippy::all, clippy::pedantic)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "vitrine-cli", version, about = "Vitrine cache control CLI", long_about = None)]
pub struct Cli {
    /// Site base URL, e.g. <https://showcase.example.com>
    #[arg(long, env = "VITRINE_SITE_URL")]
    pub site: Option<String>,

    /// Path to a file containing the revalidation secret (takes precedence over env)
    #[arg(long, env = "VITRINE_SECRET_FILE")]
    pub secret_file: Option<PathBuf>,

    /// Revalidation secret from env (no CLI flag, to keep it out of shell history)
    #[arg(hide = true, env = "REVALIDATE_SECRET", hide_env_values = true)]
    pub secret_env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Invalidate cached pages on demand
    Revalidate(RevalidateArgs),
    /// Show every cache entry with its freshness state
    Status,
    /// Check that the service is up
    Health,
}

#[derive(Parser, Debug)]
pub struct RevalidateArgs {
    #[command(subcommand)]
    pub action: RevalidateCmd,
}

#[derive(Subcommand, Debug)]
pub enum RevalidateCmd {
    /// Invalidate one page, e.g. `/apps/uniswap`
    Path { path: String },
    /// Invalidate every entry carrying a tag, e.g. `apps`
    Tag { tag: String },
}
