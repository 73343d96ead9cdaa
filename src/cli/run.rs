//! CLI entry point and dispatch
//!
//! `run()` handles ALL output including errors and returns
//! `Result<(), ExitCode>`; main.rs only maps the error to a process exit.

use super::args::{Cli, Commands};
use super::commands;
use crate::config::{CliOverrides, Config};
use crate::exit_codes::ExitCode;
use crate::template::ResolveOptions;
use clap::Parser;

/// Main CLI execution function.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    crate::logging::init(cli.verbose);

    match cli.command {
        Commands::Scenarios { json } => commands::execute_scenarios_command(json),
        Commands::Run {
            scenarios,
            repo,
            timeout,
            expect,
            pattern_kind,
            file_name,
            keep,
            json,
        } => {
            let overrides = CliOverrides {
                config_path: cli.config,
                repo,
                timeout_secs: timeout,
                keep_artifacts: keep,
            };
            let config = match Config::discover(&overrides) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("✗ {e}");
                    return Err(ExitCode::CONFIG);
                }
            };

            let options = ResolveOptions {
                pattern_kind: pattern_kind.map(Into::into),
                file_name,
            };

            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    eprintln!("✗ failed to create async runtime: {e}");
                    return Err(ExitCode::INTERNAL);
                }
            };

            rt.block_on(commands::execute_run_command(
                &config,
                &scenarios,
                expect.into(),
                &options,
                json,
            ))
        }
    }
}
