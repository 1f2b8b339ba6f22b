//! # Wallet Session
//!
//! Owns the connect/disconnect lifecycle against an injected provider and the signing
//! handle derived from it.
//!
//! ## State machine
//!
//! ```text
//!              connect()                  chain == target
//! Disconnected ─────────▶ Connecting ──────────────────────▶ Connected
//!      ▲                      │ chain != target                  │
//!      │                      ▼                                  │ chainChanged(other)
//!      │                  WrongChain ◀───────────────────────────┘
//!      │                      │ switch (+ add chain) succeeded
//!      │                      └──────────────────────────────▶ Connected
//!      └──── disconnect() / accountsChanged([]) / provider disconnect (from any state)
//! ```
//!
//! ## Sharing
//!
//! [`WalletSession`] is a cheap clone over one shared state. It is constructed once and
//! handed to [`ContractClient`](crate::client::ContractClient) and
//! [`TransactionOrchestrator`](crate::orchestrator::TransactionOrchestrator), which ask
//! for a fresh [`SigningHandle`] on every operation instead of caching one.
//!
//! ## Overtaken acquisitions
//!
//! Every `disconnect()` bumps a generation counter. An acquisition that started under an
//! older generation discards its result, so a slow wallet prompt cannot resurrect a
//! session the user already disconnected.
//!
//! ## Invalidation
//!
//! Account and chain switches bump a read epoch and emit
//! [`SessionNotice::Invalidated`]. Views drop cached reads on that notice, and
//! [`StaleGuard`](crate::staleness::StaleGuard) rejects results issued under an older
//! epoch.

use crate::provider::{classify, InjectedProvider, ProviderError, ProviderEvent};
use alloy_primitives::Address;
use lib_core::config::ChainConfig;
use lib_core::error::{AppError, Result};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Disconnected,
    Connecting,
    Connected,
    WrongChain,
}

impl SessionStatus {
    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Disconnected => "Disconnected",
            SessionStatus::Connecting => "Connecting",
            SessionStatus::Connected => "Connected",
            SessionStatus::WrongChain => "Wrong network",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Capability to read and submit on behalf of the connected account.
///
/// Only exists inside [`WalletSessionState::Connected`], so holding one implies the
/// account was authorized on the target chain when it was handed out.
#[derive(Debug, Clone)]
pub struct SigningHandle {
    address: Address,
    chain_id: u64,
    provider: InjectedProvider,
}

impl SigningHandle {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn provider(&self) -> &InjectedProvider {
        &self.provider
    }
}

/// Snapshot of the session.
#[derive(Debug, Clone, Default)]
pub enum WalletSessionState {
    #[default]
    Disconnected,
    Connecting,
    Connected(SigningHandle),
    WrongChain { chain_id: u64 },
}

impl WalletSessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            WalletSessionState::Disconnected => SessionStatus::Disconnected,
            WalletSessionState::Connecting => SessionStatus::Connecting,
            WalletSessionState::Connected(_) => SessionStatus::Connected,
            WalletSessionState::WrongChain { .. } => SessionStatus::WrongChain,
        }
    }

    pub fn address(&self) -> Option<Address> {
        self.signing_handle().map(SigningHandle::address)
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            WalletSessionState::Connected(handle) => Some(handle.chain_id),
            WalletSessionState::WrongChain { chain_id } => Some(*chain_id),
            _ => None,
        }
    }

    pub fn signing_handle(&self) -> Option<&SigningHandle> {
        match self {
            WalletSessionState::Connected(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        matches!(self, WalletSessionState::Connected(_))
    }
}

/// Broadcast to every [`WalletSession::subscribe`] receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionNotice {
    StateChanged(SessionStatus),
    /// Cached reads taken before this epoch are stale.
    Invalidated { epoch: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Consent {
    /// User-initiated: may open wallet dialogs (account access, network switch).
    Prompt,
    /// Startup probe or external event: never prompts.
    Silent,
}

struct SessionInner {
    provider: Option<InjectedProvider>,
    config: Arc<ChainConfig>,
    state: RwLock<WalletSessionState>,
    generation: AtomicU64,
    epoch: AtomicU64,
    acquiring: AtomicBool,
    listeners: Mutex<Vec<async_channel::Sender<SessionNotice>>>,
}

/// Marks a handle acquisition in flight; released on every exit path.
struct AcquireGuard<'a>(&'a AtomicBool);

impl<'a> AcquireGuard<'a> {
    fn try_new(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for AcquireGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("state", &*self.inner.state.read())
            .field("epoch", &self.epoch())
            .finish()
    }
}

impl WalletSession {
    /// `provider` is `None` when the host has no injected wallet.
    pub fn new(provider: Option<InjectedProvider>, config: Arc<ChainConfig>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                provider,
                config,
                state: RwLock::new(WalletSessionState::Disconnected),
                generation: AtomicU64::new(0),
                epoch: AtomicU64::new(0),
                acquiring: AtomicBool::new(false),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ChainConfig {
        &self.inner.config
    }

    pub fn has_provider(&self) -> bool {
        self.inner.provider.is_some()
    }

    pub fn state(&self) -> WalletSessionState {
        self.inner.state.read().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.read().status()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.state.read().is_connected()
    }

    /// Current read epoch; bumped by every invalidation.
    pub fn epoch(&self) -> u64 {
        self.inner.epoch.load(Ordering::Acquire)
    }

    fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::Acquire)
    }

    pub fn subscribe(&self) -> async_channel::Receiver<SessionNotice> {
        let (tx, rx) = async_channel::unbounded();
        self.inner.listeners.lock().push(tx);
        rx
    }

    /// The provider's own notification stream, to be driven through [`listen`](Self::listen).
    ///
    /// One consumer only; views observe changes through [`subscribe`](Self::subscribe).
    pub fn provider_events(&self) -> Option<async_channel::Receiver<ProviderEvent>> {
        self.inner.provider.as_ref().map(InjectedProvider::subscribe)
    }

    /// Ask the wallet for account access and bring the session onto the target chain.
    ///
    /// A no-op returning the current state while already `Connected` or while another
    /// acquisition is in flight.
    ///
    /// # Errors
    ///
    /// - [`AppError::ProviderNotFound`] without an injected provider (state untouched)
    /// - [`AppError::UserRejected`] when account access is declined
    /// - [`AppError::ChainMismatch`] when the switch is declined or the wallet stays on
    ///   another chain; the session stays `WrongChain`
    /// - [`AppError::ChainSwitchFailed`] when the wallet fails the switch otherwise
    pub async fn connect(&self) -> Result<WalletSessionState> {
        let provider = self
            .inner
            .provider
            .clone()
            .ok_or(AppError::ProviderNotFound)?;

        if self.is_connected() {
            return Ok(self.state());
        }
        let Some(_acquiring) = AcquireGuard::try_new(&self.inner.acquiring) else {
            debug!("Connect ignored: acquisition already in flight");
            return Ok(self.state());
        };

        let generation = self.generation();
        self.set_state(WalletSessionState::Connecting);
        info!("Connecting wallet");

        let result = match provider.request_accounts().await {
            Ok(accounts) => {
                self.acquire(&provider, accounts, Consent::Prompt, generation)
                    .await
            }
            Err(err) => Err(classify(&err)),
        };
        self.settle(generation, result)
    }

    /// Clear the session. Never fails and never contacts the provider.
    pub fn disconnect(&self) {
        self.inner.generation.fetch_add(1, Ordering::AcqRel);
        let previous =
            std::mem::replace(&mut *self.inner.state.write(), WalletSessionState::Disconnected);

        if previous.status() != SessionStatus::Disconnected {
            info!(previous = %previous.status(), "Wallet disconnected");
            self.notify(SessionNotice::StateChanged(SessionStatus::Disconnected));
            self.invalidate();
        }
    }

    /// The current handle, or [`AppError::NotConnected`] unless `Connected`.
    pub fn signing_handle(&self) -> Result<SigningHandle> {
        self.inner
            .state
            .read()
            .signing_handle()
            .cloned()
            .ok_or(AppError::NotConnected)
    }

    /// Silent startup probe: re-acquire an already-authorized account without prompting.
    ///
    /// Failures are logged and leave the session as it was.
    pub async fn restore(&self) -> WalletSessionState {
        let Some(provider) = self.inner.provider.clone() else {
            debug!("No injected provider; nothing to restore");
            return self.state();
        };
        if self.status() != SessionStatus::Disconnected {
            return self.state();
        }
        let Some(_acquiring) = AcquireGuard::try_new(&self.inner.acquiring) else {
            return self.state();
        };

        let generation = self.generation();
        match provider.accounts().await {
            Ok(accounts) if accounts.is_empty() => debug!("No previously authorized account"),
            Ok(accounts) => {
                if let Err(err) = self
                    .acquire(&provider, accounts, Consent::Silent, generation)
                    .await
                {
                    info!(error = %err, "Session restore incomplete");
                }
            }
            Err(err) => warn!(error = %err, "Failed to probe authorized accounts"),
        }
        self.state()
    }

    /// Feed an external provider notification into the state machine.
    pub async fn handle_event(&self, event: ProviderEvent) {
        let Some(provider) = self.inner.provider.clone() else {
            return;
        };

        match event {
            ProviderEvent::AccountsChanged(accounts) if accounts.is_empty() => {
                info!("Wallet reported no accounts");
                self.disconnect();
            }
            ProviderEvent::AccountsChanged(accounts) => {
                if self.status() == SessionStatus::Disconnected {
                    debug!("Account change ignored while disconnected");
                    return;
                }
                let Some(_acquiring) = AcquireGuard::try_new(&self.inner.acquiring) else {
                    debug!("Account change dropped: acquisition already in flight");
                    return;
                };
                info!(account = %accounts[0], "Wallet account changed");
                self.invalidate();

                let generation = self.generation();
                if let Err(err) = self
                    .acquire(&provider, accounts, Consent::Silent, generation)
                    .await
                {
                    warn!(error = %err, "Failed to refresh session after account change");
                    self.drop_stale_handle(generation);
                }
            }
            ProviderEvent::ChainChanged(chain_id) => {
                info!(chain_id, "Wallet network changed");
                self.invalidate();

                if !matches!(
                    self.status(),
                    SessionStatus::Connected | SessionStatus::WrongChain
                ) {
                    return;
                }
                let Some(_acquiring) = AcquireGuard::try_new(&self.inner.acquiring) else {
                    debug!(chain_id, "Network change dropped: acquisition already in flight");
                    return;
                };

                let generation = self.generation();
                if chain_id != self.inner.config.chain_id {
                    match self.commit(generation, WalletSessionState::WrongChain { chain_id }) {
                        Ok(_) => info!(chain_id, "Wallet left the target network"),
                        Err(err) => debug!(error = %err, "Wrong-network state not applied"),
                    }
                    return;
                }
                match provider.accounts().await {
                    Ok(accounts) if accounts.is_empty() => self.disconnect(),
                    Ok(accounts) => {
                        if let Err(err) = self
                            .acquire(&provider, accounts, Consent::Silent, generation)
                            .await
                        {
                            warn!(error = %err, "Failed to refresh session after network change");
                            self.drop_stale_handle(generation);
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, "Failed to read accounts after network change");
                        self.drop_stale_handle(generation);
                    }
                }
            }
            ProviderEvent::Disconnect => {
                info!("Provider disconnected");
                self.disconnect();
            }
        }
    }

    /// Drive provider notifications until the stream closes.
    pub async fn listen(&self, events: async_channel::Receiver<ProviderEvent>) {
        while let Ok(event) = events.recv().await {
            self.handle_event(event).await;
        }
        debug!("Provider event stream closed");
    }

    /// Bump the read epoch and tell subscribers to drop cached reads.
    pub fn invalidate(&self) {
        let epoch = self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(epoch, "Invalidating cached reads");
        self.notify(SessionNotice::Invalidated { epoch });
    }

    /// Read the chain, repair it if allowed, and commit `Connected`.
    async fn acquire(
        &self,
        provider: &InjectedProvider,
        accounts: Vec<Address>,
        consent: Consent,
        generation: u64,
    ) -> Result<WalletSessionState> {
        let address = accounts.first().copied().ok_or(AppError::NotConnected)?;
        let target = self.inner.config.chain_id;

        let mut chain_id = provider.chain_id().await.map_err(|e| classify(&e))?;
        if chain_id != target {
            self.commit(generation, WalletSessionState::WrongChain { chain_id })?;
            if consent == Consent::Silent {
                return Err(AppError::ChainMismatch {
                    expected: target,
                    actual: chain_id,
                });
            }
            chain_id = self.switch_network(provider, chain_id, generation).await?;
        }

        let state = self.commit(
            generation,
            WalletSessionState::Connected(SigningHandle {
                address,
                chain_id,
                provider: provider.clone(),
            }),
        )?;
        info!(%address, chain_id, "Wallet connected");
        Ok(state)
    }

    /// Switch to the target chain, adding it to the wallet first if it is unknown.
    async fn switch_network(
        &self,
        provider: &InjectedProvider,
        current: u64,
        generation: u64,
    ) -> Result<u64> {
        let config = &self.inner.config;
        info!(from = current, to = config.chain_id, "Requesting network switch");

        match provider.switch_chain(config.chain_id).await {
            Ok(()) => {}
            Err(err) if err.is_unrecognized_chain() => {
                info!(chain = %config.chain_name, "Chain unknown to wallet, adding it");
                provider
                    .add_chain(config.add_chain_params())
                    .await
                    .map_err(|e| self.switch_error(&e, current))?;
                provider
                    .switch_chain(config.chain_id)
                    .await
                    .map_err(|e| self.switch_error(&e, current))?;
            }
            Err(err) => return Err(self.switch_error(&err, current)),
        }

        let actual = provider.chain_id().await.map_err(|e| classify(&e))?;
        if actual != config.chain_id {
            self.commit(generation, WalletSessionState::WrongChain { chain_id: actual })?;
            return Err(AppError::ChainMismatch {
                expected: config.chain_id,
                actual,
            });
        }
        Ok(actual)
    }

    fn switch_error(&self, err: &ProviderError, current: u64) -> AppError {
        if err.is_user_rejected() || err.is_unrecognized_chain() {
            AppError::ChainMismatch {
                expected: self.inner.config.chain_id,
                actual: current,
            }
        } else {
            warn!(error = %err, "Network switch failed");
            AppError::ChainSwitchFailed(err.message.clone())
        }
    }

    /// Apply `state` unless a `disconnect()` overtook the acquisition.
    fn commit(&self, generation: u64, state: WalletSessionState) -> Result<WalletSessionState> {
        {
            let mut current = self.inner.state.write();
            if self.generation() != generation {
                debug!("Discarding overtaken session acquisition");
                return Err(AppError::NotConnected);
            }
            *current = state.clone();
        }
        self.notify(SessionNotice::StateChanged(state.status()));
        Ok(state)
    }

    /// A failed re-acquisition must not leave the previous handle usable.
    fn drop_stale_handle(&self, generation: u64) {
        let dropped = {
            let mut state = self.inner.state.write();
            let stale = state.is_connected() && self.generation() == generation;
            if stale {
                *state = WalletSessionState::Disconnected;
            }
            stale
        };
        if dropped {
            info!("Dropped stale signing handle");
            self.notify(SessionNotice::StateChanged(SessionStatus::Disconnected));
        }
    }

    fn set_state(&self, state: WalletSessionState) {
        let status = state.status();
        *self.inner.state.write() = state;
        self.notify(SessionNotice::StateChanged(status));
    }

    /// A failed `connect()` must not leave the session stuck in `Connecting`.
    fn settle(
        &self,
        generation: u64,
        result: Result<WalletSessionState>,
    ) -> Result<WalletSessionState> {
        if let Err(err) = &result {
            warn!(error = %err, "Wallet connection failed");
            let reset = {
                let mut state = self.inner.state.write();
                let stuck = matches!(*state, WalletSessionState::Connecting)
                    && self.generation() == generation;
                if stuck {
                    *state = WalletSessionState::Disconnected;
                }
                stuck
            };
            if reset {
                self.notify(SessionNotice::StateChanged(SessionStatus::Disconnected));
            }
        }
        result
    }

    fn notify(&self, notice: SessionNotice) {
        // Unbounded channels only refuse sends once the receiver is gone
        self.inner
            .listeners
            .lock()
            .retain(|listener| listener.try_send(notice).is_ok());
    }
}
