//! CLI subcommand logic and output formatting.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chain_quoter::config::CliConfig;
use chain_quoter::types::{GasPriceResponse, QuoteResponse};
use chain_quoter::{AppConfig, GasPriceCache, GasPriceReader, GasPriceRefresher, JsonRpcChainClient, SwapQuoter};
use clap::{Parser, Subcommand};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "chain-quoter-cli", about = "Gas prices and UniswapV2 quotes from the command line")]
pub struct Cli {
    #[command(flatten)]
    pub config: CliConfig,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the current gas price snapshot
    GasPrice {
        /// Keep refreshing and print every new snapshot until Ctrl-C
        #[arg(long)]
        watch: bool,
    },
    /// Quote a single-pair swap
    Quote {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Human-readable amount of `from`, e.g. 1.5
        #[arg(long)]
        amount: String,
    },
}

/// Handles CLI commands and output.
pub struct CliHandler {
    config: AppConfig,
    client: Arc<JsonRpcChainClient>,
    cache: Arc<GasPriceCache>,
}

impl CliHandler {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Arc::new(JsonRpcChainClient::new(config.rpc_url.clone(), config.rpc_timeout())?);
        Ok(Self {
            config,
            client,
            cache: Arc::new(GasPriceCache::new()),
        })
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::GasPrice { watch: false } => self.handle_gas_price().await,
            Command::GasPrice { watch: true } => self.handle_gas_watch().await,
            Command::Quote { from, to, amount } => self.handle_quote(&from, &to, &amount).await,
        }
    }

    async fn handle_gas_price(&self) -> Result<()> {
        let reader = GasPriceReader::new(self.client.clone(), self.cache.clone(), self.config.gas_price_ttl());
        let snapshot = reader.current().await?;
        println!("{}", serde_json::to_string_pretty(&GasPriceResponse::from(snapshot.as_ref()))?);
        Ok(())
    }

    async fn handle_gas_watch(&self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresher = Arc::new(GasPriceRefresher::new(
            self.client.clone(),
            self.cache.clone(),
            self.config.gas_price_ttl(),
        ));
        let handle = refresher.spawn(self.config.refresh_period(), shutdown_rx);
        info!(rpc_url = %self.config.rpc_url, "watching gas price, Ctrl-C to stop");

        let mut poll = tokio::time::interval(Duration::from_millis(250));
        let mut last_printed = None;
        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Some(snapshot) = self.cache.get() {
                        if last_printed != Some(snapshot.captured_at) {
                            last_printed = Some(snapshot.captured_at);
                            println!("{}", serde_json::to_string(&GasPriceResponse::from(snapshot.as_ref()))?);
                        }
                    }
                }
                sig = signal::ctrl_c() => {
                    if let Err(e) = sig {
                        warn!(error = %e, "failed to listen for Ctrl-C");
                    }
                    break;
                }
            }
        }

        let _ = shutdown_tx.send(true);
        handle.await?;
        Ok(())
    }

    async fn handle_quote(&self, from: &str, to: &str, amount: &str) -> Result<()> {
        let quoter = SwapQuoter::from_config(self.client.clone(), &self.config)?;
        let quote = quoter.quote_str(from, to, amount).await?;
        println!("{}", serde_json::to_string_pretty(&QuoteResponse::from(&quote))?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_quote_with_global_flags() {
        let cli = Cli::try_parse_from([
            "chain-quoter-cli",
            "quote",
            "--from",
            "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2",
            "--to",
            "0x6B175474E89094C44Da98b954EedeAC495271d0F",
            "--amount",
            "1.5",
            "--rpc-url",
            "http://localhost:8545",
        ])
        .unwrap();
        assert_eq!(cli.config.rpc_url.as_deref(), Some("http://localhost:8545"));
        match cli.command {
            Command::Quote { amount, .. } => assert_eq!(amount, "1.5"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_gas_watch() {
        let cli = Cli::try_parse_from(["chain-quoter-cli", "--gas-refresh-secs", "5", "gas-price", "--watch"]).unwrap();
        assert_eq!(cli.config.gas_refresh_secs, Some(5));
        assert!(matches!(cli.command, Command::GasPrice { watch: true }));
    }
}
