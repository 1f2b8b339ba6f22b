//! Browser bindings for the crowdfunding wallet core
//!
//! Connects `lib-evm` to the page's injected wallet and exposes session state to Leptos
//! views through [`state::wallet::WalletContext`].

use leptos::prelude::*;
use wasm_bindgen::prelude::*;

mod app;
pub mod services;
pub mod state;
pub mod utils;

use app::App;

#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("Crowdfunding wallet starting");

    if let Err(e) = lib_core::init_config() {
        log::error!("Falling back to default chain configuration: {}", e);
    }

    leptos::mount::mount_to_body(|| view! { <App/> });
}
