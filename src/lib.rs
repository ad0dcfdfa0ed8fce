/// DeepWiki Panel - Chrome Extension showing DeepWiki docs beside GitHub repos
/// Built with Rust + WASM + Yew

mod background;
mod bridge;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod messenger;
pub mod panel;
pub mod repo;
pub mod state;
pub mod ui;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export the resolver for JavaScript access
#[wasm_bindgen]
pub fn resolve_repo(url: &str) -> String {
    let config = config::ExtensionConfig::default();
    repo::resolve(url, &config.source_host)
        .map(|repo| repo.to_string())
        .unwrap_or_default()
}

// Register the service worker listeners
#[wasm_bindgen]
pub fn start_background() {
    background::start();
}

// Start the Yew app for the side panel
#[wasm_bindgen]
pub fn start_panel() {
    yew::Renderer::<ui::panel::PanelApp>::new().render();
}
