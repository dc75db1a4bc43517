mod cli;
mod commands;
mod infra;
mod routes;
mod server;

use ecotide::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
