//! Scripted in-memory provider for tests.

use crate::abi::{ICrowdfunding, TierRecord};
use crate::provider::{
    codes, parse_chain_id, Eip1193Provider, InjectedProvider, ProviderError, ProviderEvent,
    TransactionRequest,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use lib_core::config::{ChainConfig, SEPOLIA_CHAIN_ID};
use parking_lot::Mutex;
use serde_json::{json, Value};
use shared::dto::campaign::{CampaignDetails, CampaignState};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const ALICE: Address = Address::repeat_byte(0xa1);
pub const BOB: Address = Address::repeat_byte(0xb0);
pub const MAINNET: u64 = 1;
const MINED_BLOCK: u64 = 16;

pub fn test_config() -> Arc<ChainConfig> {
    Arc::new(ChainConfig {
        receipt_poll_interval: Duration::from_millis(1),
        ..ChainConfig::default()
    })
}

#[derive(Default)]
struct MockState {
    accounts: Vec<Address>,
    authorized: bool,
    chain_id: u64,
    known_chains: HashSet<u64>,
    requests: Vec<(String, Value)>,
    failures: HashMap<String, VecDeque<ProviderError>>,
    calls: HashMap<(Address, [u8; 4]), Result<Bytes, ProviderError>>,
    gates: HashMap<String, async_channel::Receiver<()>>,
    receipt_delay: usize,
    receipt_status: u64,
    sent: Vec<(B256, TransactionRequest)>,
}

#[derive(Clone)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
    events: (
        async_channel::Sender<ProviderEvent>,
        async_channel::Receiver<ProviderEvent>,
    ),
}

impl MockProvider {
    /// Wallet holding `ALICE` on Sepolia, not yet authorized.
    pub fn new() -> Self {
        let state = MockState {
            accounts: vec![ALICE],
            chain_id: SEPOLIA_CHAIN_ID,
            known_chains: [SEPOLIA_CHAIN_ID, MAINNET].into_iter().collect(),
            receipt_status: 1,
            ..MockState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            events: async_channel::unbounded(),
        }
    }

    pub fn injected(&self) -> InjectedProvider {
        InjectedProvider::new(self.clone())
    }

    pub fn authorize(&self) -> &Self {
        self.state.lock().authorized = true;
        self
    }

    pub fn set_accounts(&self, accounts: Vec<Address>) -> &Self {
        self.state.lock().accounts = accounts;
        self
    }

    pub fn on_chain(&self, chain_id: u64) -> &Self {
        self.state.lock().chain_id = chain_id;
        self
    }

    pub fn forget_chain(&self, chain_id: u64) -> &Self {
        self.state.lock().known_chains.remove(&chain_id);
        self
    }

    pub fn fail_next(&self, method: &str, error: ProviderError) -> &Self {
        self.state
            .lock()
            .failures
            .entry(method.to_string())
            .or_default()
            .push_back(error);
        self
    }

    pub fn respond<C: SolCall>(&self, to: Address, data: impl Into<Bytes>) -> &Self {
        self.state
            .lock()
            .calls
            .insert((to, C::SELECTOR), Ok(data.into()));
        self
    }

    pub fn revert<C: SolCall>(&self, to: Address, error: ProviderError) -> &Self {
        self.state.lock().calls.insert((to, C::SELECTOR), Err(error));
        self
    }

    /// Hold every `method` request until a value arrives on `gate`.
    pub fn gate(&self, method: &str, gate: async_channel::Receiver<()>) -> &Self {
        self.state.lock().gates.insert(method.to_string(), gate);
        self
    }

    /// Report the receipt as pending for `polls` lookups.
    pub fn delay_receipt(&self, polls: usize) -> &Self {
        self.state.lock().receipt_delay = polls;
        self
    }

    pub fn fail_receipts(&self) -> &Self {
        self.state.lock().receipt_status = 0;
        self
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.0.try_send(event);
    }

    pub fn chain_id(&self) -> u64 {
        self.state.lock().chain_id
    }

    /// Method names in request order.
    pub fn methods(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.state
            .lock()
            .requests
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.params_of(method).len()
    }

    pub fn clear_log(&self) {
        self.state.lock().requests.clear();
    }

    pub fn sent(&self) -> Vec<TransactionRequest> {
        self.state
            .lock()
            .sent
            .iter()
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    /// Answer all eight detail reads for `address`.
    pub fn stub_details(&self, address: Address, details: &CampaignDetails) -> &Self {
        let status: u8 = match details.state {
            CampaignState::Active => 0,
            CampaignState::Successful => 1,
            CampaignState::Failed => 2,
        };
        let tiers: Vec<TierRecord> = details
            .tiers
            .iter()
            .map(|tier| TierRecord {
                name: tier.name.clone(),
                amount: tier.amount,
                backers: U256::from(tier.backers),
            })
            .collect();

        self.respond::<ICrowdfunding::nameCall>(address, details.name.abi_encode())
            .respond::<ICrowdfunding::descriptionCall>(address, details.description.abi_encode())
            .respond::<ICrowdfunding::goalCall>(address, details.goal.abi_encode())
            .respond::<ICrowdfunding::deadlineCall>(address, U256::from(details.deadline).abi_encode())
            .respond::<ICrowdfunding::ownerCall>(address, details.owner.abi_encode())
            .respond::<ICrowdfunding::getContractBalanceCall>(address, details.balance.abi_encode())
            .respond::<ICrowdfunding::getTiersCall>(address, tiers.abi_encode())
            .respond::<ICrowdfunding::getCampaignStatusCall>(address, U256::from(status).abi_encode())
    }

    fn handle(&self, method: &str, params: &Value) -> Result<Value, ProviderError> {
        let mut state = self.state.lock();
        if let Some(err) = state.failures.get_mut(method).and_then(VecDeque::pop_front) {
            return Err(err);
        }

        match method {
            "eth_requestAccounts" => {
                state.authorized = true;
                Ok(json!(state.accounts))
            }
            "eth_accounts" => {
                if state.authorized {
                    Ok(json!(state.accounts))
                } else {
                    Ok(json!([]))
                }
            }
            "eth_chainId" => Ok(json!(format!("0x{:x}", state.chain_id))),
            "wallet_switchEthereumChain" => {
                let chain_id = parse_chain_id(&params[0]["chainId"])
                    .ok_or_else(|| ProviderError::new(-32602, "invalid chainId"))?;
                if !state.known_chains.contains(&chain_id) {
                    return Err(ProviderError::new(
                        codes::UNRECOGNIZED_CHAIN,
                        "Unrecognized chain ID",
                    ));
                }
                state.chain_id = chain_id;
                Ok(Value::Null)
            }
            "wallet_addEthereumChain" => {
                let chain_id = parse_chain_id(&params[0]["chainId"])
                    .ok_or_else(|| ProviderError::new(-32602, "invalid chainId"))?;
                state.known_chains.insert(chain_id);
                Ok(Value::Null)
            }
            "eth_call" => {
                let request: TransactionRequest = serde_json::from_value(params[0].clone())
                    .map_err(|e| ProviderError::new(-32602, e.to_string()))?;
                let to = request.to.unwrap_or_default();
                let data = request.data.unwrap_or_default();
                let mut selector = [0u8; 4];
                if data.len() >= 4 {
                    selector.copy_from_slice(&data[..4]);
                }
                match state.calls.get(&(to, selector)) {
                    Some(Ok(bytes)) => Ok(json!(bytes)),
                    Some(Err(err)) => Err(err.clone()),
                    None => Err(ProviderError::new(
                        codes::EXECUTION_REVERTED,
                        "execution reverted",
                    )),
                }
            }
            "eth_sendTransaction" => {
                let request: TransactionRequest = serde_json::from_value(params[0].clone())
                    .map_err(|e| ProviderError::new(-32602, e.to_string()))?;
                let hash = B256::with_last_byte(state.sent.len() as u8 + 1);
                state.sent.push((hash, request));
                Ok(json!(hash))
            }
            "eth_getTransactionReceipt" => {
                if state.receipt_delay > 0 {
                    state.receipt_delay -= 1;
                    return Ok(Value::Null);
                }
                Ok(json!({
                    "transactionHash": params[0],
                    "blockNumber": format!("0x{:x}", MINED_BLOCK),
                    "status": format!("0x{:x}", state.receipt_status),
                }))
            }
            "eth_getTransactionByHash" => {
                let hash: B256 = serde_json::from_value(params[0].clone())
                    .map_err(|e| ProviderError::new(-32602, e.to_string()))?;
                let Some((_, tx)) = state.sent.iter().find(|(h, _)| *h == hash) else {
                    return Ok(Value::Null);
                };
                Ok(json!({
                    "hash": hash,
                    "from": tx.from.unwrap_or_default(),
                    "to": tx.to,
                    "input": tx.data.clone().unwrap_or_default(),
                    "value": tx.value.unwrap_or_default(),
                    "blockNumber": format!("0x{:x}", MINED_BLOCK),
                }))
            }
            other => Err(ProviderError::new(
                codes::UNSUPPORTED_METHOD,
                format!("unsupported method {}", other),
            )),
        }
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for MockProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        let gate = {
            let mut state = self.state.lock();
            state.requests.push((method.to_string(), params.clone()));
            state.gates.get(method).cloned()
        };
        if let Some(gate) = gate {
            let _ = gate.recv().await;
        }
        self.handle(method, &params)
    }

    fn subscribe(&self) -> async_channel::Receiver<ProviderEvent> {
        self.events.1.clone()
    }
}
