mod cli;

use std::process::ExitCode;

use clap::Parser;
use cli::args::Cli;

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    cli::run(cli)
}
