//! Root component: wallet status and connect/disconnect controls.

use leptos::prelude::*;
use shared::utils::short_address;

use crate::state::wallet::provide_wallet_context;

#[component]
pub fn App() -> impl IntoView {
    let wallet = provide_wallet_context();

    let status = move || wallet.view.with(|view| view.status.label());
    let address = move || {
        wallet
            .view
            .with(|view| view.address.as_ref().map(short_address))
            .unwrap_or_default()
    };
    let error = move || wallet.view.with(|view| view.error.clone());

    view! {
        <main class="wallet">
            <span class="wallet-status">{status}</span>
            <span class="wallet-address">{address}</span>
            <Show
                when=move || wallet.is_connected()
                fallback=move || {
                    view! {
                        <button
                            disabled=move || !wallet.has_provider()
                            on:click=move |_| wallet.connect()
                        >
                            "Connect Wallet"
                        </button>
                    }
                }
            >
                <button on:click=move |_| wallet.disconnect()>"Disconnect"</button>
            </Show>
            {move || error().map(|message| view! { <p class="wallet-error">{message}</p> })}
        </main>
    }
}
