use std::sync::Arc;

use chain_quoter::api::{ApiServer, ApiState};
use chain_quoter::{AppConfig, GasPriceCache, GasPriceReader, GasPriceRefresher, JsonRpcChainClient, SwapQuoter};
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::load()?;
    let client = Arc::new(JsonRpcChainClient::new(config.rpc_url.clone(), config.rpc_timeout())?);
    let cache = Arc::new(GasPriceCache::new());

    // Keep the gas price warm in the background
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let refresher = Arc::new(GasPriceRefresher::new(client.clone(), cache.clone(), config.gas_price_ttl()));
    let refresher_handle = refresher.spawn(config.refresh_period(), shutdown_rx.clone());

    let state = ApiState {
        gas: GasPriceReader::new(client.clone(), cache.clone(), config.gas_price_ttl()),
        quoter: SwapQuoter::from_config(client.clone(), &config)?,
        port: client,
    };
    let server = ApiServer::new(state);

    let mut server_shutdown = shutdown_rx;
    let served = server
        .start(&config.api_addr, async move {
            while server_shutdown.changed().await.is_ok() {
                if *server_shutdown.borrow() {
                    break;
                }
            }
        });
    tokio::pin!(served);

    // Run until ctrl+c or the server dies
    let result = tokio::select! {
        res = &mut served => res,
        sig = signal::ctrl_c() => {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
            sig?;
            served.await
        }
    };
    let _ = shutdown_tx.send(true);
    if let Err(e) = refresher_handle.await {
        error!(error = %e, "gas price refresher task panicked");
    }
    result
}
