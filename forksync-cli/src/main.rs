use std::process::ExitCode;

use anyhow::Result;
use forksync_cli::app;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    app::run().await
}
