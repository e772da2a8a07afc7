//! Keeps the gas price cache warm and serves request-time reads from it.

use crate::cache::{is_fresh, GasPriceCache};
use crate::chain::ChainDataPort;
use crate::types::{GasPriceSnapshot, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// What a single refresh tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed,
    SkippedUnreachable,
    SkippedFresh,
    Failed,
}

/// Fetch fee data once and install it as the current snapshot.
async fn fetch_and_store<P: ChainDataPort>(port: &P, cache: &GasPriceCache) -> Result<Arc<GasPriceSnapshot>> {
    let fee_data = port.fetch_fee_data().await?;
    let snapshot = GasPriceSnapshot::from_fee_data(fee_data, Utc::now());
    info!(
        gas_price = %snapshot.gas_price,
        max_fee_per_gas = %snapshot.max_fee_per_gas,
        max_priority_fee_per_gas = %snapshot.max_priority_fee_per_gas,
        "installed gas price snapshot"
    );
    Ok(cache.set(snapshot))
}

/// Periodic background refresh of [`GasPriceCache`].
///
/// Failures are absorbed: the last good snapshot stays in place until a
/// later tick succeeds.
pub struct GasPriceRefresher<P> {
    port: Arc<P>,
    cache: Arc<GasPriceCache>,
    ttl: Duration,
}

impl<P: ChainDataPort + 'static> GasPriceRefresher<P> {
    pub fn new(port: Arc<P>, cache: Arc<GasPriceCache>, ttl: Duration) -> Self {
        Self { port, cache, ttl }
    }

    pub async fn tick(&self) -> RefreshOutcome {
        if !self.port.is_reachable().await {
            warn!("chain provider unreachable, keeping cached gas price");
            return RefreshOutcome::SkippedUnreachable;
        }
        if self.cache.is_valid(Utc::now(), self.ttl) {
            debug!("gas price snapshot still fresh");
            return RefreshOutcome::SkippedFresh;
        }
        match fetch_and_store(self.port.as_ref(), &self.cache).await {
            Ok(_) => RefreshOutcome::Refreshed,
            Err(e) => {
                error!(error = %e, category = e.category(), "gas price refresh failed");
                RefreshOutcome::Failed
            }
        }
    }

    /// Run [`tick`](Self::tick) every `period` until `shutdown` turns true
    /// or its sender is dropped. The first tick fires immediately.
    pub fn spawn(self: Arc<Self>, period: Duration, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs_f64(), ttl_secs = self.ttl.as_secs(), "gas price refresher started");
            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = self.tick().await;
                        debug!(?outcome, "refresh tick finished");
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            info!("gas price refresher stopped");
        })
    }
}

/// Request-time access to the current gas price.
pub struct GasPriceReader<P> {
    port: Arc<P>,
    cache: Arc<GasPriceCache>,
    ttl: Duration,
}

impl<P> Clone for GasPriceReader<P> {
    fn clone(&self) -> Self {
        Self {
            port: self.port.clone(),
            cache: self.cache.clone(),
            ttl: self.ttl,
        }
    }
}

impl<P: ChainDataPort> GasPriceReader<P> {
    pub fn new(port: Arc<P>, cache: Arc<GasPriceCache>, ttl: Duration) -> Self {
        Self { port, cache, ttl }
    }

    /// The cached snapshot, stale or not, without touching the network.
    ///
    /// Only a cache that was never populated triggers a fetch here; keeping
    /// the snapshot fresh is the refresher's job. Errors only when that
    /// first fetch fails.
    pub async fn current(&self) -> Result<Arc<GasPriceSnapshot>> {
        if let Some(snapshot) = self.cache.get() {
            if !is_fresh(&snapshot, Utc::now(), self.ttl) {
                debug!(captured_at = %snapshot.captured_at, "serving stale gas price");
            }
            return Ok(snapshot);
        }
        debug!("gas price cache empty, fetching");
        fetch_and_store(self.port.as_ref(), &self.cache).await.map_err(|e| {
            error!(error = %e, "no gas price available");
            e
        })
    }
}
