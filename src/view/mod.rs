// VIEW: Collaborator seams and the selection-to-presentation bridge
//
// The engine never talks to a renderer, the DOM or a timer API directly; it
// goes through the traits below. `headless` backs them with plain memory,
// `web` with the browser.
use std::time::Duration;

use glam::Vec3;

use crate::error::EngineError;
use crate::model::{ItemId, ProbeId, Record, VisualHandle};

pub mod headless;
pub mod sync;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use sync::{CameraFollow, ViewSyncBridge};

/// What kind of object a visual stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Item,
    Probe,
}

/// Scene/object registry owned by the renderer.
pub trait SceneRegistry {
    fn register_item(&mut self, id: &ItemId, position: Vec3) -> VisualHandle;
    fn add_visual(&mut self, kind: VisualKind, position: Vec3) -> VisualHandle;
    /// Returns false if the visual was already gone.
    fn remove_visual(&mut self, handle: VisualHandle) -> bool;
    fn contains_visual(&self, handle: VisualHandle) -> bool;
    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec3) -> bool;
    fn set_highlighted(&mut self, handle: VisualHandle, highlighted: bool) -> bool;
}

/// Pointer-lock style first-person controls around the viewpoint.
pub trait CaptureControls {
    /// Ask for exclusive pointer capture. Success may be reported later
    /// through a capture-changed event.
    fn request_lock(&mut self) -> Result<(), EngineError>;
    fn release_lock(&mut self);
    fn is_locked(&self) -> bool;
    fn move_right(&mut self, amount: f32);
    fn move_forward(&mut self, amount: f32);
    fn look(&mut self, yaw_delta: f32, pitch_delta: f32);
    fn look_at(&mut self, target: Vec3);
    fn world_direction(&self) -> Vec3;
    fn position(&self) -> Vec3;
    fn set_position(&mut self, position: Vec3);
}

/// Tabular presentation: one checkbox row per item.
pub trait TableView {
    /// Returns false if no row exists for `id`.
    fn set_checked(&mut self, id: &ItemId, checked: bool) -> bool;
}

pub trait DetailPanel {
    fn show(&mut self, record: &Record);
    fn clear(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// One-shot timers for probe deadlines. When a timer fires, the host calls
/// `InteractionEngine::on_probe_deadline` with the probe id.
pub trait DeadlineScheduler {
    fn schedule(&mut self, probe: ProbeId, after: Duration) -> TimerHandle;
    /// Cancelling an unknown or already-fired timer is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

/// The full set of collaborators an engine instance drives.
pub struct Collaborators {
    pub scene: Box<dyn SceneRegistry>,
    pub controls: Box<dyn CaptureControls>,
    pub table: Box<dyn TableView>,
    pub detail: Box<dyn DetailPanel>,
    pub scheduler: Box<dyn DeadlineScheduler>,
}
