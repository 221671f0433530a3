use anyhow::Result;
use ensaluti::cli;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    let action = cli::start()?;

    let result = action.execute().await;

    // Flush buffered spans before exiting.
    cli::telemetry::shutdown_tracer();

    result
}
