use anyhow::Result;
use clap::Parser;

use es_semantic::cli::Cli;
use es_semantic::logging::{self, LoggingOptions};

fn main() -> Result<()> {
    // Load .env early; ignore if missing.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let _logging = logging::init(&LoggingOptions::from_path(cli.log_config.clone()))?;

    es_semantic::run(cli)
}
