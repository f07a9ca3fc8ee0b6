pub mod cli;
pub mod config;
pub mod corpus;
pub mod embed;
pub mod es;
pub mod logging;
pub mod profiler;
pub mod search;

use anyhow::Result;

/// Library entrypoint; dispatches a parsed command line.
pub fn run(args: cli::Cli) -> Result<()> {
    cli::run(args)
}
