use clap::Parser;
use layered_router::cli::{run_cli, Cli};
use layered_router::logging::init_logging;

fn main() -> anyhow::Result<()> {
    init_logging()?;
    run_cli(Cli::parse())
}
