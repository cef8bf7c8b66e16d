pub mod cli;
pub mod config;
pub mod secrets;
pub mod store;
pub mod text;
pub mod view;

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error};

use cli::commands::{self, CliError};
use cli::Cli;
use config::ConfigManager;
use text::scrub_secrets;

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level()),
    )
    .format_timestamp_millis()
    .try_init();

    debug!("Starting issuedesk {}", env!("CARGO_PKG_VERSION"));

    let manager = match ConfigManager::new() {
        Ok(manager) => manager,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::execute(&cli, &manager)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let CliError::Api(api_err) = &err {
                error!("{}", scrub_secrets(&api_err.to_string()));
            }
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
