/// Error types shared by the background and panel contexts
use thiserror::Error;
use wasm_bindgen::JsValue;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExtensionError {
    /// The panel did not acknowledge a message within the retry budget
    #[error("Failed to deliver message after {attempts} attempts: {reason}")]
    MessageDelivery { attempts: u32, reason: String },

    /// A newer event for the same tab replaced this message
    #[error("Message superseded by a newer event")]
    Superseded,

    #[error("Failed to load {url}")]
    ContentLoad { url: String },

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Browser API call failed: {0}")]
    Browser(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl ExtensionError {
    pub fn storage(e: JsValue) -> Self {
        ExtensionError::StorageUnavailable(describe(&e))
    }

    pub fn browser(e: JsValue) -> Self {
        ExtensionError::Browser(describe(&e))
    }
}

impl From<serde_wasm_bindgen::Error> for ExtensionError {
    fn from(e: serde_wasm_bindgen::Error) -> Self {
        ExtensionError::Serialization(e.to_string())
    }
}

/// Best-effort text for a rejected JS promise
pub fn describe(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            js_sys::Reflect::get(value, &JsValue::from_str("message"))
                .ok()
                .and_then(|m| m.as_string())
        })
        .unwrap_or_else(|| format!("{:?}", value))
}
