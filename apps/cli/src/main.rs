//! LeadLoom CLI — contact enrichment for tabular lead lists.
//!
//! Looks each row's subject up on the web and fills in contact attributes
//! (phone, email, website, socials) extracted with a language model.

mod commands;

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
