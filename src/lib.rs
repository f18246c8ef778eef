// Re-export all public modules so they can be used from main.rs
pub mod config;
pub mod error;
pub mod logging;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

pub use config::{EngineConfig, KeyBindings};
pub use controller::{EngineEvent, InputEvent, InteractionEngine, TickReport};
pub use error::EngineError;
pub use model::{Item, ItemId, Record};
pub use view::Collaborators;

#[cfg(target_arch = "wasm32")]
pub use view::web::WebEngine;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    logging::init();
    tracing::info!("cubeviz module loaded");
}
