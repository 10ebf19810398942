mod auth;
mod cli;
mod collector;
mod config;
mod error;
mod github;
mod output;
mod report;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    output::print_banner();

    let cli = Cli::parse();
    info!("Starting collab-audit - Repository Collaborator Audit");
    cli.execute().await?;

    Ok(())
}
