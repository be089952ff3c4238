mod cli;
mod demo;
mod infra;
mod routes;
mod server;

use hiring_workflow::error::AppError;

/// Parses the command line and runs the selected command.
pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
