use anyhow::{Context, Result};
use ticker::{Page, PriceClient, PriceUpdater};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use widget::{config::Config, publish};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(version = %config.version, api = %config.api_base, "starting price widget");

    let page = Page::load(&config.page_path).await?;
    let price_client = PriceClient::new(config.api_base.clone(), config.api_key.clone())
        .context("init price client failed")?;
    let updater = PriceUpdater::new(page.clone(), price_client);

    let publisher = tokio::spawn(publish::publish_snapshots(
        page,
        config.version.clone(),
        config.output_path.clone(),
    ));
    let runner = tokio::spawn(updater.run());

    shutdown_signal().await;

    runner.abort();
    publisher.abort();
    if let Err(e) = runner.await
        && !e.is_cancelled()
    {
        error!(error = ?e, "updater task failed");
    }

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = ?e, "failed to install signal handlers, falling back to ctrl-c");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
