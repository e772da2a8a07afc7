//! Scenario tests against an in-memory chain.


use crate::chain::ChainDataPort;
use crate::types::{FeeData, QuoterError, Result};
use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) const ONE_GWEI: u64 = 1_000_000_000;

pub(crate) type Selector = [u8; 4];

/// Scripted [`ChainDataPort`] that records every call.
pub(crate) struct MockChain {
    reachable: AtomicBool,
    fee_result: Mutex<Result<FeeData>>,
    fee_calls: AtomicUsize,
    responses: Mutex<HashMap<(Address, Selector), Result<Vec<u8>>>>,
    calls: Mutex<Vec<(Address, Vec<u8>)>>,
}

impl MockChain {
    pub(crate) fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            fee_result: Mutex::new(Ok(fee_data(20))),
            fee_calls: AtomicUsize::new(0),
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub(crate) fn set_fee_result(&self, result: Result<FeeData>) {
        *self.fee_result.lock().unwrap() = result;
    }

    pub(crate) fn fee_calls(&self) -> usize {
        self.fee_calls.load(Ordering::SeqCst)
    }

    /// Answer calls of `selector` on `contract` with `words` laid end to end.
    pub(crate) fn respond(&self, contract: Address, selector: Selector, words: Vec<U256>) {
        let data = words.iter().flat_map(|w| w.to_be_bytes::<32>()).collect();
        self.responses.lock().unwrap().insert((contract, selector), Ok(data));
    }

    pub(crate) fn fail(&self, contract: Address, selector: Selector, error: QuoterError) {
        self.responses.lock().unwrap().insert((contract, selector), Err(error));
    }

    /// Every `(contract, calldata)` seen so far, in order.
    pub(crate) fn calls(&self) -> Vec<(Address, Vec<u8>)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn selectors(&self) -> Vec<(Address, Selector)> {
        self.calls().iter().map(|(contract, data)| (*contract, selector_of(data))).collect()
    }

    pub(crate) fn calls_to(&self, selector: Selector) -> usize {
        self.selectors().iter().filter(|(_, s)| *s == selector).count()
    }
}

fn selector_of(calldata: &[u8]) -> Selector {
    calldata[..4].try_into().unwrap()
}

#[async_trait]
impl ChainDataPort for MockChain {
    async fn fetch_fee_data(&self) -> Result<FeeData> {
        self.fee_calls.fetch_add(1, Ordering::SeqCst);
        self.fee_result.lock().unwrap().clone()
    }

    async fn read_contract(&self, contract: Address, calldata: &[u8]) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push((contract, calldata.to_vec()));
        self.responses
            .lock()
            .unwrap()
            .get(&(contract, selector_of(calldata)))
            .cloned()
            .unwrap_or_else(|| Err(QuoterError::rpc("eth_call", "no scripted response")))
    }

    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}

pub(crate) fn fee_data(gas_price_gwei: u64) -> FeeData {
    FeeData {
        gas_price: Some(U256::from(gas_price_gwei * ONE_GWEI)),
        max_fee_per_gas: Some(U256::from(2 * gas_price_gwei * ONE_GWEI + ONE_GWEI)),
        max_priority_fee_per_gas: Some(U256::from(ONE_GWEI)),
    }
}

pub(crate) fn addr(byte: u8) -> Address {
    Address::repeat_byte(byte)
}

pub(crate) fn address_word(address: Address) -> U256 {
    U256::from_be_bytes(address.into_word().0)
}

/// `n * 10^decimals` as a chain word.
pub(crate) fn units(n: u64, decimals: u8) -> U256 {
    U256::from(n) * U256::from(10u8).pow(U256::from(decimals))
}
