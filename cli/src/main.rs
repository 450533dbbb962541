use crate::cli::Cli;

use clap::Parser;
use std::process::exit;

mod cli;
mod command;
mod error;

fn main() {
    let cli: Cli = Cli::parse();
    if let Err(err) = cli.run() {
        eprintln!("error: {err}");
        exit(1);
    }
}
