mod cli;
mod commands;
mod error;
mod metadata;
mod output;

use clap::Parser;
use std::process::ExitCode;
use streakscope_core::Stage;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "streakscope=debug,streakscope_core=debug,streakscope_render=debug"
    } else {
        "streakscope=info,streakscope_core=info,streakscope_render=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let envelope = commands::run(cli).await?;
    output::render(&envelope, cli.format, cli.pretty)?;

    if cli.strict && !envelope.is_clean() {
        return Err(CliError::StrictModeViolation {
            warning_count: envelope.meta.warnings.len(),
            error_count: envelope.errors.len(),
        });
    }

    Ok(envelope
        .failed_stage()
        .map_or(ExitCode::SUCCESS, |stage| ExitCode::from(failure_exit_code(stage))))
}

/// Exit code for a run whose envelope carries errors.
const fn failure_exit_code(stage: Stage) -> u8 {
    match stage {
        Stage::Render => 6,
        Stage::Calendar | Stage::StreakQuery | Stage::ReentryQuery | Stage::Normalize => 3,
    }
}
