//! `window.ethereum` Integration via wasm-bindgen
//!
//! Implements [`Eip1193Provider`] over the wallet injected into the page (MetaMask and
//! other EIP-1193 wallets). Requests go through a small JS shim that normalizes thrown
//! errors into plain `{ code, message, data }` objects; provider notifications are
//! forwarded into an `async-channel` consumed by [`WalletSession::listen`].
//!
//! [`WalletSession::listen`]: lib_evm::WalletSession::listen

use alloy_primitives::Address;
use async_trait::async_trait;
use lib_evm::provider::{parse_chain_id, Eip1193Provider, ProviderError, ProviderEvent};
use serde::Serialize;
use serde_json::Value;
use wasm_bindgen::prelude::*;

// ============================================================================
// INJECTED PROVIDER (JavaScript Interop)
// ============================================================================

#[wasm_bindgen(inline_js = "
export function hasEthereum() {
    return typeof window !== 'undefined' && !!window.ethereum;
}

export async function ethereumRequest(method, params) {
    if (!window.ethereum) {
        throw { code: 4900, message: 'No injected provider' };
    }
    try {
        return await window.ethereum.request({ method, params });
    } catch (error) {
        throw {
            code: typeof error.code === 'number' ? error.code : -32603,
            message: error.message || String(error),
            data: error.data === undefined ? null : error.data,
        };
    }
}

export function onEthereumEvent(name, callback) {
    if (window.ethereum && typeof window.ethereum.on === 'function') {
        window.ethereum.on(name, callback);
    }
}
")]
extern "C" {
    fn hasEthereum() -> bool;

    /// Forward an EIP-1193 request; rejects with a normalized error object
    #[wasm_bindgen(catch)]
    async fn ethereumRequest(method: &str, params: JsValue) -> Result<JsValue, JsValue>;

    fn onEthereumEvent(name: &str, callback: &Closure<dyn FnMut(JsValue)>);
}

fn provider_error(error: JsValue) -> ProviderError {
    serde_wasm_bindgen::from_value(error.clone()).unwrap_or_else(|_| {
        let message = error
            .as_string()
            .unwrap_or_else(|| format!("{:?}", error));
        ProviderError::internal(message)
    })
}

/// The page's injected wallet.
pub struct BrowserProvider {
    events: (
        async_channel::Sender<ProviderEvent>,
        async_channel::Receiver<ProviderEvent>,
    ),
    // Registered with the wallet for the lifetime of the page
    _listeners: Vec<Closure<dyn FnMut(JsValue)>>,
}

impl BrowserProvider {
    /// `None` when no wallet is injected into the page.
    pub fn detect() -> Option<Self> {
        if !hasEthereum() {
            log::info!("No injected Ethereum provider found");
            return None;
        }

        let (tx, rx) = async_channel::unbounded();

        let accounts_tx = tx.clone();
        let on_accounts = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            match serde_wasm_bindgen::from_value::<Vec<Address>>(value) {
                Ok(accounts) => {
                    let _ = accounts_tx.try_send(ProviderEvent::AccountsChanged(accounts));
                }
                Err(e) => log::warn!("Ignoring malformed accountsChanged payload: {}", e),
            }
        });

        let chain_tx = tx.clone();
        let on_chain = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
            let chain_id = serde_wasm_bindgen::from_value::<Value>(value)
                .ok()
                .and_then(|raw| parse_chain_id(&raw));
            match chain_id {
                Some(chain_id) => {
                    let _ = chain_tx.try_send(ProviderEvent::ChainChanged(chain_id));
                }
                None => log::warn!("Ignoring malformed chainChanged payload"),
            }
        });

        let disconnect_tx = tx.clone();
        let on_disconnect = Closure::<dyn FnMut(JsValue)>::new(move |_: JsValue| {
            let _ = disconnect_tx.try_send(ProviderEvent::Disconnect);
        });

        onEthereumEvent("accountsChanged", &on_accounts);
        onEthereumEvent("chainChanged", &on_chain);
        onEthereumEvent("disconnect", &on_disconnect);
        log::info!("Injected Ethereum provider detected");

        Some(Self {
            events: (tx, rx),
            _listeners: vec![on_accounts, on_chain, on_disconnect],
        })
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for BrowserProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        // Plain objects, not JS Maps
        let params = params
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| ProviderError::internal(e.to_string()))?;

        match ethereumRequest(method, params).await {
            Ok(result) => serde_wasm_bindgen::from_value(result).map_err(|e| {
                ProviderError::internal(format!("malformed {} response: {}", method, e))
            }),
            Err(error) => Err(provider_error(error)),
        }
    }

    fn subscribe(&self) -> async_channel::Receiver<ProviderEvent> {
        self.events.1.clone()
    }
}
