//! HTTP JSON-RPC implementation of [`ChainDataPort`].

use super::ChainDataPort;
use crate::types::{FeeData, QuoterError, Result};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Priority fee assumed when the node does not implement `eth_maxPriorityFeePerGas`.
const FALLBACK_PRIORITY_FEE_WEI: u64 = 1_000_000_000;

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockHeader {
    base_fee_per_gas: Option<String>,
}

/// JSON-RPC client bound to a single endpoint.
pub struct JsonRpcChainClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcChainClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoterError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });
        debug!(method, "JSON-RPC request");

        let resp = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;
        let body: RpcResponse<T> = resp.json().await.map_err(|e| transport_error(method, e))?;

        if let Some(err) = body.error {
            return Err(QuoterError::rpc(method, format!("code {}: {}", err.code, err.message)));
        }
        body.result
            .ok_or_else(|| QuoterError::rpc(method, "response carried neither result nor error"))
    }

    async fn request_quantity(&self, method: &str, params: Value) -> Result<U256> {
        let hex_value: String = self.request(method, params).await?;
        parse_quantity(method, &hex_value)
    }
}

fn transport_error(method: &str, e: reqwest::Error) -> QuoterError {
    if e.is_connect() || e.is_timeout() {
        QuoterError::ChainUnreachable(format!("{}: {}", method, e))
    } else {
        QuoterError::rpc(method, e.to_string())
    }
}

/// Parse a JSON-RPC hex quantity such as `"0x4a817c800"`.
pub fn parse_quantity(method: &str, value: &str) -> Result<U256> {
    let digits = value
        .strip_prefix("0x")
        .ok_or_else(|| QuoterError::rpc(method, format!("quantity {:?} lacks 0x prefix", value)))?;
    if digits.is_empty() {
        return Err(QuoterError::rpc(method, "empty quantity"));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| QuoterError::rpc(method, format!("bad quantity {:?}: {}", value, e)))
}

#[async_trait]
impl ChainDataPort for JsonRpcChainClient {
    async fn fetch_fee_data(&self) -> Result<FeeData> {
        let gas_price = self.request_quantity("eth_gasPrice", json!([])).await?;

        let block: Option<BlockHeader> = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;
        let base_fee = match block.and_then(|b| b.base_fee_per_gas) {
            Some(hex_value) => Some(parse_quantity("eth_getBlockByNumber", &hex_value)?),
            None => None,
        };

        let (max_fee_per_gas, max_priority_fee_per_gas) = match base_fee {
            Some(base_fee) => {
                let priority = match self.request_quantity("eth_maxPriorityFeePerGas", json!([])).await {
                    Ok(priority) => priority,
                    Err(QuoterError::RpcCallFailed { message, .. }) => {
                        debug!(%message, "eth_maxPriorityFeePerGas unsupported, using fallback");
                        U256::from(FALLBACK_PRIORITY_FEE_WEI)
                    }
                    Err(e) => return Err(e),
                };
                let max_fee = base_fee
                    .saturating_mul(U256::from(2u8))
                    .saturating_add(priority);
                (Some(max_fee), Some(priority))
            }
            None => (None, None),
        };

        Ok(FeeData {
            gas_price: Some(gas_price),
            max_fee_per_gas,
            max_priority_fee_per_gas,
        })
    }

    async fn read_contract(&self, contract: Address, calldata: &[u8]) -> Result<Vec<u8>> {
        let call = json!({
            "to": contract.to_string(),
            "data": format!("0x{}", hex::encode(calldata)),
        });
        let raw: String = self.request("eth_call", json!([call, "latest"])).await?;
        hex::decode(raw.trim_start_matches("0x"))
            .map_err(|e| QuoterError::rpc("eth_call", format!("invalid hex in result: {}", e)))
    }

    async fn is_reachable(&self) -> bool {
        match self.request::<String>("eth_chainId", json!([])).await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, url = %self.url, "chain liveness check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::contracts::{self, IUniswapV2Pair};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;
    use std::sync::Arc;

    const GWEI: u64 = 1_000_000_000;

    /// Local JSON-RPC node answering each method with a scripted body.
    /// Unscripted methods get a "method not found" error object.
    async fn scripted_node(replies: &[(&str, Value)]) -> String {
        let replies: Arc<HashMap<String, Value>> =
            Arc::new(replies.iter().map(|(method, body)| (method.to_string(), body.clone())).collect());
        let app = Router::new().route(
            "/",
            post(move |Json(req): Json<Value>| {
                let replies = replies.clone();
                async move {
                    let method = req["method"].as_str().unwrap_or_default();
                    let mut body = replies
                        .get(method)
                        .cloned()
                        .unwrap_or_else(|| json!({ "error": { "code": -32601, "message": "method not found" } }));
                    body["jsonrpc"] = json!("2.0");
                    body["id"] = req["id"].clone();
                    Json(body)
                }
            }),
        );
        serve(app).await
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}", addr)
    }

    fn client(url: &str) -> JsonRpcChainClient {
        JsonRpcChainClient::new(url, Duration::from_secs(5)).unwrap()
    }

    fn quantity(wei: u64) -> Value {
        json!({ "result": format!("{:#x}", wei) })
    }

    fn block(base_fee: Option<u64>) -> Value {
        match base_fee {
            Some(wei) => json!({ "result": { "number": "0x10", "baseFeePerGas": format!("{:#x}", wei) } }),
            None => json!({ "result": { "number": "0x10" } }),
        }
    }

    #[tokio::test]
    async fn max_fee_is_twice_base_fee_plus_priority() {
        let url = scripted_node(&[
            ("eth_gasPrice", quantity(20 * GWEI)),
            ("eth_getBlockByNumber", block(Some(10 * GWEI))),
            ("eth_maxPriorityFeePerGas", quantity(2 * GWEI)),
        ])
        .await;

        let fees = client(&url).fetch_fee_data().await.unwrap();
        assert_eq!(fees.gas_price, Some(U256::from(20 * GWEI)));
        assert_eq!(fees.max_priority_fee_per_gas, Some(U256::from(2 * GWEI)));
        assert_eq!(fees.max_fee_per_gas, Some(U256::from(22 * GWEI)));
    }

    #[tokio::test]
    async fn missing_priority_fee_method_falls_back_to_one_gwei() {
        let url = scripted_node(&[
            ("eth_gasPrice", quantity(20 * GWEI)),
            ("eth_getBlockByNumber", block(Some(10 * GWEI))),
        ])
        .await;

        let fees = client(&url).fetch_fee_data().await.unwrap();
        assert_eq!(fees.max_priority_fee_per_gas, Some(U256::from(FALLBACK_PRIORITY_FEE_WEI)));
        assert_eq!(fees.max_fee_per_gas, Some(U256::from(21 * GWEI)));
    }

    #[tokio::test]
    async fn pre_london_block_has_no_eip1559_fields() {
        let url = scripted_node(&[
            ("eth_gasPrice", quantity(15 * GWEI)),
            ("eth_getBlockByNumber", block(None)),
            ("eth_maxPriorityFeePerGas", quantity(3 * GWEI)),
        ])
        .await;

        let fees = client(&url).fetch_fee_data().await.unwrap();
        assert_eq!(fees.gas_price, Some(U256::from(15 * GWEI)));
        assert_eq!(fees.max_fee_per_gas, None);
        assert_eq!(fees.max_priority_fee_per_gas, None);
    }

    #[tokio::test]
    async fn error_object_is_rpc_call_failed() {
        let url = scripted_node(&[(
            "eth_gasPrice",
            json!({ "error": { "code": -32000, "message": "header not found" } }),
        )])
        .await;

        let err = client(&url).fetch_fee_data().await.unwrap_err();
        assert!(matches!(err, QuoterError::RpcCallFailed { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn closed_port_is_chain_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = client(&format!("http://{}", addr));

        let err = client.fetch_fee_data().await.unwrap_err();
        assert!(matches!(err, QuoterError::ChainUnreachable(_)), "{err:?}");
        assert!(!client.is_reachable().await);
    }

    #[tokio::test]
    async fn slow_node_times_out_as_chain_unreachable() {
        let app = Router::new().route(
            "/",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x1" }))
            }),
        );
        let url = serve(app).await;
        let client = JsonRpcChainClient::new(url, Duration::from_millis(100)).unwrap();

        let err = client.fetch_fee_data().await.unwrap_err();
        assert!(matches!(err, QuoterError::ChainUnreachable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn eth_call_results_decode_through_typed_calls() {
        let token = Address::repeat_byte(0x42);
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(token.as_slice());
        let url = scripted_node(&[
            ("eth_chainId", json!({ "result": "0x1" })),
            ("eth_call", json!({ "result": format!("0x{}", hex::encode(word)) })),
        ])
        .await;
        let client = client(&url);

        assert!(client.is_reachable().await);
        let returned = contracts::read(&client, Address::repeat_byte(0x99), IUniswapV2Pair::token0Call {})
            .await
            .unwrap();
        assert_eq!(returned._0, token);
    }

    #[tokio::test]
    async fn malformed_eth_call_results_are_rpc_errors() {
        let url = scripted_node(&[("eth_call", json!({ "result": "0xzz" }))]).await;
        let err = client(&url).read_contract(Address::ZERO, &[0u8; 4]).await.unwrap_err();
        assert!(matches!(err, QuoterError::RpcCallFailed { .. }), "{err:?}");

        // address word with non-zero high bytes
        let dirty = format!("0x01{}", "11".repeat(31));
        let url = scripted_node(&[("eth_call", json!({ "result": dirty }))]).await;
        let err = contracts::read(&client(&url), Address::ZERO, IUniswapV2Pair::token1Call {})
            .await
            .unwrap_err();
        assert!(matches!(err, QuoterError::RpcCallFailed { .. }), "{err:?}");
    }

    #[test]
    fn parses_quantities() {
        assert_eq!(parse_quantity("eth_gasPrice", "0x4a817c800").unwrap(), U256::from(20_000_000_000u64));
        assert_eq!(parse_quantity("eth_gasPrice", "0x0").unwrap(), U256::ZERO);
        assert!(parse_quantity("eth_gasPrice", "4a817c800").is_err());
        assert!(parse_quantity("eth_gasPrice", "0x").is_err());
        assert!(parse_quantity("eth_gasPrice", "0xzz").is_err());
    }

    #[test]
    fn rpc_envelope_decodes_errors() {
        let body: RpcResponse<String> = serde_json::from_str(
            r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"execution reverted"}}"#,
        )
        .unwrap();
        assert!(body.result.is_none());
        assert_eq!(body.error.unwrap().message, "execution reverted");
    }

    #[test]
    fn block_header_without_base_fee() {
        let block: Option<BlockHeader> =
            serde_json::from_str(r#"{"number":"0x10","hash":"0xabc"}"#).unwrap();
        assert!(block.unwrap().base_fee_per_gas.is_none());
    }
}
