use anyhow::Context;
use lazy_stats::{ServerConfig, StatServer};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ServerConfig::from_env()?;
    smol::block_on(async {
        let server = StatServer::bind(&config)
            .await
            .with_context(|| format!("starting server on {}", config.bind_addr()))?;
        server.run().await?;
        Ok(())
    })
}
