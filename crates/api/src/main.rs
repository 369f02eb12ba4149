use anyhow::Context;

use testrig_api::{FixtureConfig, FixtureServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    testrig_observability::init();

    let config = FixtureConfig::from_env();
    let addr = config.addr;
    let server = FixtureServer::spawn(config)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("serving fixtures on {}", server.base_url());

    server.wait().await.context("fixture server stopped")?;
    Ok(())
}
