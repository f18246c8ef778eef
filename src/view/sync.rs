//! Reflects selection changes into the scene, the table and the detail
//! panel, and steers the camera toward the newest selection.

use glam::Vec3;

use super::{CaptureControls, Collaborators};
use crate::config::EngineConfig;
use crate::controller::selection::{SelectionChange, SelectionCoordinator};
use crate::model::{ItemId, ItemRegistry};

/// An in-flight smoothed camera move toward a selected item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFollow {
    pub target_eye: Vec3,
    pub look_target: Vec3,
}

const FOLLOW_EPSILON: f32 = 0.01;

#[derive(Debug)]
pub struct ViewSyncBridge {
    follow: Option<CameraFollow>,
    follow_distance: f32,
    follow_smoothing: f32,
    min_height: f32,
}

impl ViewSyncBridge {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            follow: None,
            follow_distance: config.follow_distance,
            follow_smoothing: config.follow_smoothing,
            min_height: config.min_height,
        }
    }

    /// Apply a coordinator change to every presentation, synchronously.
    /// Missing visuals or rows are skipped; deletions race with handlers.
    pub fn apply(&mut self, change: &SelectionChange, items: &mut ItemRegistry, ports: &mut Collaborators) {
        if change.is_empty() {
            return;
        }

        let updates = change
            .added
            .iter()
            .map(|id| (id, true))
            .chain(change.removed.iter().map(|id| (id, false)));
        for (id, selected) in updates {
            Self::mark(id, selected, items, ports);
        }

        if let Some(id) = change.new_last_selected() {
            match items.get(id) {
                Some(item) => {
                    self.start_follow(item.position, ports.controls.as_ref());
                    ports.detail.show(&item.record);
                }
                None => tracing::debug!(%id, "last-selected item vanished before detail update"),
            }
        } else if change.last_selected.is_none() {
            self.follow = None;
            ports.detail.clear();
        }
    }

    /// Re-assert highlight and row state for everything selected, e.g. after
    /// items were rebuilt under the same ids.
    pub fn reapply(&mut self, selection: &SelectionCoordinator, items: &mut ItemRegistry, ports: &mut Collaborators) {
        for id in selection.selected() {
            Self::mark(id, true, items, ports);
        }
        match selection.last_selected().and_then(|id| items.get(id)) {
            Some(item) => ports.detail.show(&item.record),
            None => ports.detail.clear(),
        }
    }

    fn mark(id: &ItemId, selected: bool, items: &mut ItemRegistry, ports: &mut Collaborators) {
        match items.get_mut(id) {
            Some(item) => {
                item.highlighted = selected;
                if !ports.scene.set_highlighted(item.visual, selected) {
                    tracing::debug!(%id, "visual gone, highlight skipped");
                }
            }
            None => tracing::debug!(%id, "item gone, highlight skipped"),
        }
        if !ports.table.set_checked(id, selected) {
            tracing::debug!(%id, "table row gone, checkbox skipped");
        }
    }

    fn start_follow(&mut self, item_position: Vec3, controls: &dyn CaptureControls) {
        let eye = controls.position();
        // Approach along the current line of sight to the item, level with it
        // if we are already on top of it.
        let approach = (item_position - eye).try_normalize().unwrap_or(Vec3::NEG_Z);
        let mut target_eye = item_position - approach * self.follow_distance;
        target_eye.y = target_eye.y.max(self.min_height);

        self.follow = Some(CameraFollow { target_eye, look_target: item_position });
    }

    pub fn cancel_follow(&mut self) {
        self.follow = None;
    }

    pub fn follow(&self) -> Option<CameraFollow> {
        self.follow
    }

    /// Step the camera toward the follow target. Returns true while following.
    pub fn advance_follow(&mut self, delta: f32, controls: &mut dyn CaptureControls) -> bool {
        let Some(follow) = self.follow else {
            return false;
        };

        let t = 1.0 - (-self.follow_smoothing * delta.max(0.0)).exp();
        let next = controls.position().lerp(follow.target_eye, t);

        if next.distance(follow.target_eye) < FOLLOW_EPSILON {
            controls.set_position(follow.target_eye);
            controls.look_at(follow.look_target);
            self.follow = None;
            return false;
        }

        controls.set_position(next);
        controls.look_at(follow.look_target);
        true
    }
}
