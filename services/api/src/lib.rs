mod cli;
mod identity;
mod infra;
mod routes;
mod server;

use docforge::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
