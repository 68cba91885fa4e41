use std::net::SocketAddr;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use traveltales_api_kernel::config::AppConfig;
use traveltales_api_kernel::startup;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // load environment before the filter reads RUST_LOG
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")))
        .init();

    let config = AppConfig::from_env()?;
    let repo = startup::connect_repository(&config).await?;
    let (app, plugins) = startup::build_router(&config, repo).await?;

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            // call plugin shutdown hooks
            for p in plugins.iter() {
                p.on_shutdown().await;
            }
        })
        .await?;

    Ok(())
}
