#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Static web site server with email support

use anyhow::Result;
use clap::Parser;
use site::infrastructure::cli::Cli;
use tracing::{debug, warn, Level};

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.debug { Level::DEBUG } else { Level::INFO })
        .init();

    debug!("execute {}", cli.command.name());

    if let Err(err) = cli.run().await {
        warn!(error = ?err, "exit because of error.");

        return Err(err);
    }

    Ok(())
}
