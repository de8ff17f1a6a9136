//! Entry point wiring CLI dispatch to pipeline stages.

use std::process::ExitCode;

use bank_reviews::{cli::Cli, config::Settings, logging};
use tracing::{error, info, instrument};

#[tokio::main]
#[instrument]
async fn main() -> ExitCode {
    if let Err(err) = logging::init_tracing() {
        eprintln!("failed to initialise logging: {err:#}");
        return ExitCode::FAILURE;
    }
    let cli = Cli::parse();

    let outcome = match Settings::load() {
        Ok(settings) => {
            info!(?cli, "starting command");
            cli.dispatch(settings).await
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %format!("{err:#}"), "pipeline aborted");
            ExitCode::FAILURE
        }
    }
}
