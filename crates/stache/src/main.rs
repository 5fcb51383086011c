use std::process::ExitCode;

use clap::Parser;
use stache::{logging, run, Cli};

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = logging::init(cli.verbose, cli.log.as_deref()) {
        eprintln!("stache: {:#}", err);
        return ExitCode::FAILURE;
    }

    let stdout = std::io::stdout();
    match run(&cli, &mut stdout.lock()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("stache: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
