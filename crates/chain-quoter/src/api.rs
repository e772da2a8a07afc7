//! HTTP surface: `/gasPrice`, `/return/...` and `/health`.

use std::future::Future;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use tracing::info;

use crate::chain::ChainDataPort;
use crate::engine::{GasPriceReader, SwapQuoter};
use crate::types::{GasPriceResponse, QuoteResponse, QuoterError};

/// Shared handles the handlers need.
pub struct ApiState<P> {
    pub gas: GasPriceReader<P>,
    pub quoter: SwapQuoter<P>,
    pub port: Arc<P>,
}

impl<P> Clone for ApiState<P> {
    fn clone(&self) -> Self {
        Self {
            gas: self.gas.clone(),
            quoter: self.quoter.clone(),
            port: self.port.clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResp {
    status: &'static str,
    chain_reachable: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status_code: u16,
    message: String,
}

/// [`QuoterError`] rendered as `{ statusCode, message }`.
#[derive(Debug)]
pub struct ApiError(pub QuoterError);

impl From<QuoterError> for ApiError {
    fn from(e: QuoterError) -> Self {
        Self(e)
    }
}

pub fn status_for(e: &QuoterError) -> StatusCode {
    if e.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        // Upstream details stay in the logs.
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            "Internal server error".to_string()
        };
        let body = ErrorBody {
            status_code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

async fn gas_price<P: ChainDataPort + 'static>(
    State(state): State<ApiState<P>>,
) -> Result<Json<GasPriceResponse>, ApiError> {
    let snapshot = state.gas.current().await?;
    Ok(Json(GasPriceResponse::from(snapshot.as_ref())))
}

async fn swap_return<P: ChainDataPort + 'static>(
    State(state): State<ApiState<P>>,
    Path((from, to, amount_in)): Path<(String, String, String)>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let quote = state.quoter.quote_str(&from, &to, &amount_in).await?;
    Ok(Json(QuoteResponse::from(&quote)))
}

async fn health<P: ChainDataPort + 'static>(State(state): State<ApiState<P>>) -> Json<HealthResp> {
    Json(HealthResp {
        status: "ok",
        chain_reachable: state.port.is_reachable().await,
    })
}

pub fn router<P: ChainDataPort + 'static>(state: ApiState<P>) -> Router {
    Router::new()
        .route("/gasPrice", get(gas_price::<P>))
        .route("/return/:fromTokenAddress/:toTokenAddress/:amountIn", get(swap_return::<P>))
        .route("/health", get(health::<P>))
        .with_state(state)
}

pub struct ApiServer<P> {
    state: ApiState<P>,
}

impl<P: ChainDataPort + 'static> ApiServer<P> {
    pub fn new(state: ApiState<P>) -> Self {
        Self { state }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(self, addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = router(self.state);
        let addr: std::net::SocketAddr = addr.parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "API server listening");
        axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}
