/// Imports of the chrome.* extension APIs (see bridge.js)
use serde::Serialize;
use serde::de::DeserializeOwned;
use wasm_bindgen::prelude::*;

use crate::error::{describe, ExtensionError};
use crate::messenger::{PanelMessage, Transport};
use crate::state::{storage_key, StoredPanelState, TabId};

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeStorage(key: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn setPanelOptions(tab_id: TabId, enabled: bool, path: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn openPanel(tab_id: TabId) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn setOpenOnActionClick(enabled: bool) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendPanelMessage(message: JsValue, timeout_ms: u32) -> Result<JsValue, JsValue>;

    /// Resolves to the HTTP status, or 0 when the request failed
    async fn probeUrl(url: &str, timeout_ms: u32) -> JsValue;

    #[wasm_bindgen(catch)]
    async fn getActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn getTab(tab_id: TabId) -> Result<JsValue, JsValue>;

    async fn sleep(ms: u32);

    fn postMessage(message: JsValue);

    pub fn onActionClicked(callback: &Closure<dyn FnMut(JsValue)>);

    pub fn onTabUpdated(callback: &Closure<dyn FnMut(TabId, JsValue, JsValue)>);

    pub fn onTabActivated(callback: &Closure<dyn FnMut(TabId)>);

    pub fn onTabRemoved(callback: &Closure<dyn FnMut(TabId)>);

    pub fn onInstalled(callback: &Closure<dyn FnMut()>);

    /// The callback returns true when it handled the message
    pub fn onPanelMessage(callback: &Closure<dyn FnMut(JsValue) -> bool>);
}

/// Subset of chrome.tabs.Tab the extension reads
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TabInfo {
    pub id: Option<TabId>,
    pub url: Option<String>,
}

/// Subset of chrome.tabs.onUpdated changeInfo
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct TabChange {
    pub url: Option<String>,
    pub status: Option<String>,
}

fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<Option<T>, ExtensionError> {
    if value.is_null() || value.is_undefined() {
        return Ok(None);
    }
    Ok(Some(serde_wasm_bindgen::from_value(value)?))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, ExtensionError> {
    Ok(serde_wasm_bindgen::to_value(value)?)
}

pub fn parse_tab(value: JsValue) -> Option<TabInfo> {
    from_js(value).ok().flatten()
}

pub fn parse_change(value: JsValue) -> TabChange {
    from_js(value).ok().flatten().unwrap_or_default()
}

pub fn parse_message(value: JsValue) -> Option<PanelMessage> {
    from_js(value).ok().flatten()
}

pub async fn load_state(tab_id: TabId) -> Result<Option<StoredPanelState>, ExtensionError> {
    let value = getStorage(&storage_key(tab_id))
        .await
        .map_err(ExtensionError::storage)?;
    from_js(value)
}

pub async fn save_state(tab_id: TabId, stored: &StoredPanelState) -> Result<(), ExtensionError> {
    setStorage(&storage_key(tab_id), to_js(stored)?)
        .await
        .map_err(ExtensionError::storage)
}

pub async fn forget_state(tab_id: TabId) -> Result<(), ExtensionError> {
    removeStorage(&storage_key(tab_id))
        .await
        .map_err(ExtensionError::storage)
}

pub async fn load_json(key: &str) -> Result<serde_json::Value, ExtensionError> {
    let value = getStorage(key).await.map_err(ExtensionError::storage)?;
    Ok(from_js(value)?.unwrap_or(serde_json::Value::Null))
}

pub async fn set_panel_enabled(tab_id: TabId, enabled: bool, path: &str) -> Result<(), ExtensionError> {
    setPanelOptions(tab_id, enabled, path)
        .await
        .map_err(ExtensionError::browser)
}

pub async fn open_panel(tab_id: TabId) -> Result<(), ExtensionError> {
    openPanel(tab_id).await.map_err(ExtensionError::browser)
}

/// The background toggles the panel itself, so Chrome must not open it
pub async fn take_over_action_click() -> Result<(), ExtensionError> {
    setOpenOnActionClick(false)
        .await
        .map_err(ExtensionError::browser)
}

pub async fn probe(url: &str, timeout_ms: u32) -> u16 {
    probeUrl(url, timeout_ms)
        .await
        .as_f64()
        .map(|status| status as u16)
        .unwrap_or(0)
}

pub async fn active_tab() -> Result<Option<TabInfo>, ExtensionError> {
    let value = getActiveTab().await.map_err(ExtensionError::browser)?;
    from_js(value)
}

pub async fn tab(tab_id: TabId) -> Result<Option<TabInfo>, ExtensionError> {
    let value = getTab(tab_id).await.map_err(ExtensionError::browser)?;
    from_js(value)
}

pub async fn pause(ms: u32) {
    sleep(ms).await
}

/// Fire-and-forget message, safe to call while the page unloads
pub fn post(message: &PanelMessage) {
    match to_js(message) {
        Ok(value) => postMessage(value),
        Err(e) => log::warn!("Could not post {:?}: {}", message, e),
    }
}

/// runtime.sendMessage based channel to the side panel
pub struct ChromeTransport;

impl Transport for ChromeTransport {
    async fn send(&self, message: &PanelMessage, timeout_ms: u32) -> Result<(), String> {
        let value = to_js(message).map_err(|e| e.to_string())?;
        sendPanelMessage(value, timeout_ms)
            .await
            .map(|_| ())
            .map_err(|e| describe(&e))
    }

    async fn pause(&self, ms: u32) {
        sleep(ms).await
    }
}
