use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "folio-server")]
#[command(about = "Folio scholarly works search API")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "folio.toml")]
    config: String,

    /// Host to bind to, overrides the config file
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on, overrides the config file
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config before tracing: the log level and format live there.
    let config = folio::Config::load_or_create(std::path::Path::new(&args.config))?;

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let (config_host, config_port) = config
        .server
        .bind_addr
        .split_once(':')
        .unwrap_or((config.server.bind_addr.as_str(), "8080"));
    let host = args.host.unwrap_or_else(|| config_host.to_string());
    let port = args
        .port
        .map(|p| p.to_string())
        .unwrap_or_else(|| config_port.to_string());
    let addr = format!("{}:{}", host, port);

    tracing::info!("Starting folio server on {}", addr);
    tracing::info!("Config file: {}", args.config);

    let tokens = folio::backend::TokenProvider::from_config(&config.auth)?;
    let backend = std::sync::Arc::new(folio::backend::HttpBackend::new(&config.backend, tokens)?);
    let service = std::sync::Arc::new(folio::service::SearchService::new(&config, backend)?);

    let server = folio::api::ApiServer::with_cors(service, config.server.cors.clone());
    server.serve(&addr).await?;

    Ok(())
}
