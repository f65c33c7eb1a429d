use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use relay::config::Args;
use relay::processor::Processor;
use relay::server;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config()?;
    tracing::info!("config: {:?}", &config);

    let processor = Processor::new(config.responder.build()?);
    tracing::info!(
        "Relaying messages to the {} responder",
        processor.responder_name()
    );

    let app = server::app(processor, &config.server);

    tracing::info!("Listening on {}", &config.address);
    let listener = TcpListener::bind(&config.address).await?;

    server::serve(listener, app).await?;
    tracing::info!("Server shutdown");

    Ok(())
}
