//! Mocktailverse CLI: cocktail recipe ETL pipeline.
//!
//! Runs the extract, transform, enrich, load and model stages, inspects
//! their results, and hosts the web process with its health endpoint.

mod commands;
mod server;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
