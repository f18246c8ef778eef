use thiserror::Error;

use crate::model::ItemId;

/// Everything that can go wrong inside the interaction engine.
///
/// None of these are fatal: callers log them and fall back to a no-op.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("pointer capture denied: {0}")]
    CaptureDenied(String),

    #[error("no item registered with id `{0}`")]
    UnknownItem(ItemId),

    #[error("probe direction has zero length")]
    DegenerateDirection,

    #[error("invalid engine configuration: {0}")]
    Config(#[source] serde_json::Error),

    #[error("invalid dataset: {0}")]
    Dataset(String),

    #[error("engine has been disposed")]
    Disposed,
}

#[cfg(target_arch = "wasm32")]
impl From<EngineError> for wasm_bindgen::JsValue {
    fn from(err: EngineError) -> Self {
        wasm_bindgen::JsValue::from_str(&err.to_string())
    }
}
