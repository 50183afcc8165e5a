use std::process::ExitCode;

use clap::Parser;
use toolgate::config::Config;

fn main() -> ExitCode {
    let config = Config::parse();
    match toolgate::serve(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            logwise::error_sync!("toolgate: {error}", error = err.to_string());
            ExitCode::FAILURE
        }
    }
}
