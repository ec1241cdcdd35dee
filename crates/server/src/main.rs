//! Tally Server - HTTP intake for polling-station results
//!
//! Validates submitted tallies and publishes accepted ones to the
//! configured stream.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config).await?;

    Ok(())
}
