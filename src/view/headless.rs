//! In-memory collaborators.
//!
//! Each type is a cheap `Clone` over shared state, so a test or the native
//! replay can hand one copy to the engine and keep another to inspect.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use glam::Vec3;
use indexmap::IndexMap;

use super::{CaptureControls, DeadlineScheduler, DetailPanel, SceneRegistry, TableView, TimerHandle, VisualKind};
use crate::error::EngineError;
use crate::model::{ItemId, ProbeId, Record, Viewpoint, VisualHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct Visual {
    pub kind: VisualKind,
    pub item: Option<ItemId>,
    pub position: Vec3,
    pub highlighted: bool,
}

#[derive(Debug, Default)]
struct SceneState {
    next: u64,
    visuals: IndexMap<VisualHandle, Visual>,
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    state: Rc<RefCell<SceneState>>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visual_count(&self) -> usize {
        self.state.borrow().visuals.len()
    }

    pub fn count_of(&self, kind: VisualKind) -> usize {
        self.state.borrow().visuals.values().filter(|v| v.kind == kind).count()
    }

    pub fn visual(&self, handle: VisualHandle) -> Option<Visual> {
        self.state.borrow().visuals.get(&handle).cloned()
    }

    /// Item ids whose visuals are currently highlighted.
    pub fn highlighted_items(&self) -> Vec<ItemId> {
        self.state
            .borrow()
            .visuals
            .values()
            .filter(|v| v.highlighted)
            .filter_map(|v| v.item.clone())
            .collect()
    }

    pub fn handle_for(&self, id: &ItemId) -> Option<VisualHandle> {
        self.state
            .borrow()
            .visuals
            .iter()
            .find(|(_, v)| v.item.as_ref() == Some(id))
            .map(|(handle, _)| *handle)
    }

    fn insert(&mut self, visual: Visual) -> VisualHandle {
        let mut state = self.state.borrow_mut();
        let handle = VisualHandle(state.next);
        state.next += 1;
        state.visuals.insert(handle, visual);
        handle
    }
}

impl SceneRegistry for HeadlessScene {
    fn register_item(&mut self, id: &ItemId, position: Vec3) -> VisualHandle {
        self.insert(Visual {
            kind: VisualKind::Item,
            item: Some(id.clone()),
            position,
            highlighted: false,
        })
    }

    fn add_visual(&mut self, kind: VisualKind, position: Vec3) -> VisualHandle {
        self.insert(Visual { kind, item: None, position, highlighted: false })
    }

    fn remove_visual(&mut self, handle: VisualHandle) -> bool {
        self.state.borrow_mut().visuals.shift_remove(&handle).is_some()
    }

    fn contains_visual(&self, handle: VisualHandle) -> bool {
        self.state.borrow().visuals.contains_key(&handle)
    }

    fn set_visual_position(&mut self, handle: VisualHandle, position: Vec3) -> bool {
        match self.state.borrow_mut().visuals.get_mut(&handle) {
            Some(visual) => {
                visual.position = position;
                true
            }
            None => false,
        }
    }

    fn set_highlighted(&mut self, handle: VisualHandle, highlighted: bool) -> bool {
        match self.state.borrow_mut().visuals.get_mut(&handle) {
            Some(visual) => {
                visual.highlighted = highlighted;
                true
            }
            None => false,
        }
    }
}

/// A recorded call to a lateral movement primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoveCall {
    Right(f32),
    Forward(f32),
}

#[derive(Debug)]
struct ControlsState {
    viewpoint: Viewpoint,
    locked: bool,
    deny_lock: Option<String>,
    moves: Vec<MoveCall>,
}

/// Capture controls whose lock is granted (or denied) immediately.
#[derive(Debug, Clone)]
pub struct HeadlessControls {
    state: Rc<RefCell<ControlsState>>,
}

impl Default for HeadlessControls {
    fn default() -> Self {
        Self::new(Viewpoint::default())
    }
}

impl HeadlessControls {
    pub fn new(viewpoint: Viewpoint) -> Self {
        Self {
            state: Rc::new(RefCell::new(ControlsState {
                viewpoint,
                locked: false,
                deny_lock: None,
                moves: Vec::new(),
            })),
        }
    }

    /// Make every future lock request fail, as a browser refusing capture would.
    pub fn deny_lock(&self, reason: impl Into<String>) {
        self.state.borrow_mut().deny_lock = Some(reason.into());
    }

    pub fn move_calls(&self) -> Vec<MoveCall> {
        self.state.borrow().moves.clone()
    }

    pub fn viewpoint(&self) -> Viewpoint {
        self.state.borrow().viewpoint.clone()
    }
}

impl CaptureControls for HeadlessControls {
    fn request_lock(&mut self) -> Result<(), EngineError> {
        let mut state = self.state.borrow_mut();
        if let Some(reason) = &state.deny_lock {
            return Err(EngineError::CaptureDenied(reason.clone()));
        }
        state.locked = true;
        Ok(())
    }

    fn release_lock(&mut self) {
        self.state.borrow_mut().locked = false;
    }

    fn is_locked(&self) -> bool {
        self.state.borrow().locked
    }

    fn move_right(&mut self, amount: f32) {
        let mut state = self.state.borrow_mut();
        state.moves.push(MoveCall::Right(amount));
        state.viewpoint.move_right(amount);
    }

    fn move_forward(&mut self, amount: f32) {
        let mut state = self.state.borrow_mut();
        state.moves.push(MoveCall::Forward(amount));
        state.viewpoint.move_forward(amount);
    }

    fn look(&mut self, yaw_delta: f32, pitch_delta: f32) {
        self.state.borrow_mut().viewpoint.rotate(yaw_delta, pitch_delta);
    }

    fn look_at(&mut self, target: Vec3) {
        self.state.borrow_mut().viewpoint.set_look_at(target);
    }

    fn world_direction(&self) -> Vec3 {
        self.state.borrow().viewpoint.forward()
    }

    fn position(&self) -> Vec3 {
        self.state.borrow().viewpoint.eye
    }

    fn set_position(&mut self, position: Vec3) {
        self.state.borrow_mut().viewpoint.eye = position;
    }
}

/// Checkbox table keyed by item id.
#[derive(Debug, Clone, Default)]
pub struct HeadlessTable {
    rows: Rc<RefCell<IndexMap<ItemId, bool>>>,
}

impl HeadlessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all rows with unchecked rows for `records`.
    pub fn populate(&self, records: &[Record]) {
        let mut rows = self.rows.borrow_mut();
        rows.clear();
        rows.extend(records.iter().map(|r| (r.id.clone(), false)));
    }

    pub fn remove_row(&self, id: &ItemId) {
        self.rows.borrow_mut().shift_remove(id);
    }

    pub fn is_checked(&self, id: &ItemId) -> Option<bool> {
        self.rows.borrow().get(id).copied()
    }

    pub fn checked_ids(&self) -> Vec<ItemId> {
        self.rows
            .borrow()
            .iter()
            .filter(|(_, checked)| **checked)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl TableView for HeadlessTable {
    fn set_checked(&mut self, id: &ItemId, checked: bool) -> bool {
        match self.rows.borrow_mut().get_mut(id) {
            Some(row) => {
                *row = checked;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HeadlessDetailPanel {
    shown: Rc<RefCell<Option<Record>>>,
}

impl HeadlessDetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> Option<Record> {
        self.shown.borrow().clone()
    }
}

impl DetailPanel for HeadlessDetailPanel {
    fn show(&mut self, record: &Record) {
        *self.shown.borrow_mut() = Some(record.clone());
    }

    fn clear(&mut self) {
        self.shown.borrow_mut().take();
    }
}

#[derive(Debug, Default)]
struct SchedulerState {
    next: u64,
    now: Duration,
    pending: IndexMap<TimerHandle, (ProbeId, Duration)>,
}

/// Timers driven by an explicit clock.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    state: Rc<RefCell<SchedulerState>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Move the clock forward and pop every timer now due, earliest first.
    /// The caller delivers them to the engine.
    pub fn advance(&self, elapsed: Duration) -> Vec<ProbeId> {
        let mut state = self.state.borrow_mut();
        state.now += elapsed;
        let now = state.now;

        let mut due: Vec<(Duration, TimerHandle, ProbeId)> = state
            .pending
            .iter()
            .filter(|(_, (_, at))| *at <= now)
            .map(|(handle, (probe, at))| (*at, *handle, *probe))
            .collect();
        due.sort_by_key(|(at, handle, _)| (*at, handle.0));

        for (_, handle, _) in &due {
            state.pending.shift_remove(handle);
        }
        due.into_iter().map(|(_, _, probe)| probe).collect()
    }
}

impl DeadlineScheduler for ManualScheduler {
    fn schedule(&mut self, probe: ProbeId, after: Duration) -> TimerHandle {
        let mut state = self.state.borrow_mut();
        let handle = TimerHandle(state.next);
        state.next += 1;
        let at = state.now + after;
        state.pending.insert(handle, (probe, at));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.state.borrow_mut().pending.shift_remove(&handle);
    }
}
