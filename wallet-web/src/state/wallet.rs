//! Wallet state management
//!
//! One [`WalletSession`] per page, shared with the contract client and the transaction
//! orchestrator. Views read the [`WalletView`] signal; background tasks keep it in
//! sync with session notices.

use alloy_primitives::Address;
use leptos::prelude::*;
use leptos::task::spawn_local;
use lib_core::config::chain_config;
use lib_evm::{
    ContractClient, InjectedProvider, SessionStatus, StaleGuard, TransactionOrchestrator,
    WalletSession,
};
use std::sync::Arc;

use crate::services::BrowserProvider;

/// Snapshot of the session for rendering.
#[derive(Clone, Debug, PartialEq)]
pub struct WalletView {
    pub status: SessionStatus,
    pub address: Option<Address>,
    pub chain_id: Option<u64>,
    /// Changes whenever cached reads must be dropped
    pub epoch: u64,
    pub error: Option<String>,
}

impl WalletView {
    fn of(session: &WalletSession) -> Self {
        let state = session.state();
        Self {
            status: state.status(),
            address: state.address(),
            chain_id: state.chain_id(),
            epoch: session.epoch(),
            error: None,
        }
    }

    fn sync(&mut self, session: &WalletSession) {
        let error = self.error.take();
        *self = Self::of(session);
        if self.status != SessionStatus::Connected {
            self.error = error;
        }
    }
}

/// Global wallet context
#[derive(Clone, Copy)]
pub struct WalletContext {
    pub view: RwSignal<WalletView>,
    session: StoredValue<WalletSession, LocalStorage>,
    client: StoredValue<ContractClient, LocalStorage>,
    orchestrator: StoredValue<TransactionOrchestrator, LocalStorage>,
}

impl WalletContext {
    pub fn is_connected(&self) -> bool {
        self.view.with(|view| view.status == SessionStatus::Connected)
    }

    pub fn address(&self) -> Option<Address> {
        self.view.with(|view| view.address)
    }

    pub fn has_provider(&self) -> bool {
        self.session.with_value(WalletSession::has_provider)
    }

    pub fn session(&self) -> WalletSession {
        self.session.get_value()
    }

    pub fn client(&self) -> ContractClient {
        self.client.get_value()
    }

    pub fn orchestrator(&self) -> TransactionOrchestrator {
        self.orchestrator.get_value()
    }

    /// A guard bound to this session's read epoch, one per consuming view.
    pub fn stale_guard(&self) -> StaleGuard {
        StaleGuard::new(self.session())
    }

    pub fn connect(&self) {
        let session = self.session();
        let view = self.view;
        spawn_local(async move {
            if let Err(err) = session.connect().await {
                if err.is_user_rejection() {
                    log::info!("Wallet connection declined");
                } else {
                    log::warn!("Wallet connection failed: {}", err);
                }
                view.update(|v| v.error = Some(err.user_message()));
            }
        });
    }

    pub fn disconnect(&self) {
        self.session.with_value(WalletSession::disconnect);
        self.view.update(|v| v.error = None);
    }
}

/// Build the session over the page's wallet and start its background tasks.
pub fn provide_wallet_context() -> WalletContext {
    let provider = BrowserProvider::detect().map(InjectedProvider::new);
    let session = WalletSession::new(provider, Arc::new(chain_config().clone()));

    let context = WalletContext {
        view: RwSignal::new(WalletView::of(&session)),
        session: StoredValue::new_local(session.clone()),
        client: StoredValue::new_local(ContractClient::new(session.clone())),
        orchestrator: StoredValue::new_local(TransactionOrchestrator::new(session.clone())),
    };
    provide_context(context);

    if let Some(events) = session.provider_events() {
        let listener = session.clone();
        spawn_local(async move { listener.listen(events).await });
    }

    let notices = session.subscribe();
    let observed = session.clone();
    let view = context.view;
    spawn_local(async move {
        while notices.recv().await.is_ok() {
            view.update(|v| v.sync(&observed));
        }
    });

    spawn_local(async move {
        session.restore().await;
    });

    context
}

pub fn use_wallet_context() -> WalletContext {
    expect_context::<WalletContext>()
}
