use clap::{CommandFactory, Parser as ClapParser};
use std::process;

use redline::driver::{self, Cli};

fn main() {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if cli.files.is_empty() {
        if let Err(err) = Cli::command().print_help() {
            eprintln!("{err}");
        }
        return;
    }

    let options = cli.into_options();
    if let Err(err) = driver::run(&options) {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}
