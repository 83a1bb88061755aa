//! `reportforge` command-line entry point.

#![expect(clippy::print_stdout)]

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    reportforge::logging::init_console()?;
    cli::run_command(cli.command)
}
