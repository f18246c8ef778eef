#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cubeviz::controller::{FocusTarget, InputEvent, MouseButton};
use cubeviz::view::headless::{HeadlessControls, HeadlessDetailPanel, HeadlessScene, HeadlessTable, ManualScheduler};
use cubeviz::view::{CaptureControls, Collaborators};
use cubeviz::{EngineConfig, EngineEvent, InteractionEngine, ItemId, Record, TickReport};
use glam::Vec3;
use serde_json::json;

pub const FRAME: f32 = 1.0 / 60.0;

/// Engine wired to headless collaborators, with handles kept for inspection.
pub struct Harness {
    pub engine: InteractionEngine,
    pub scene: HeadlessScene,
    pub controls: HeadlessControls,
    pub table: HeadlessTable,
    pub detail: HeadlessDetailPanel,
    pub scheduler: ManualScheduler,
}

pub fn record(id: &str) -> Record {
    let fields = [
        ("id".to_string(), json!(id)),
        ("label".to_string(), json!(format!("Row {id}"))),
    ];
    Record::new(id, fields.into_iter().collect())
}

pub fn id(raw: &str) -> ItemId {
    ItemId::new(raw)
}

/// Item `n` sits at `(3n, 0.5, 0)`; the viewpoint starts at `(0, 1.6, 10)`.
pub fn item_position(n: usize) -> Vec3 {
    Vec3::new(n as f32 * 3.0, 0.5, 0.0)
}

pub fn harness(ids: &[&str]) -> Harness {
    harness_with(EngineConfig::default(), ids)
}

pub fn harness_with(config: EngineConfig, ids: &[&str]) -> Harness {
    let scene = HeadlessScene::new();
    let controls = HeadlessControls::default();
    let table = HeadlessTable::new();
    let detail = HeadlessDetailPanel::new();
    let scheduler = ManualScheduler::new();

    let ports = Collaborators {
        scene: Box::new(scene.clone()),
        controls: Box::new(controls.clone()),
        table: Box::new(table.clone()),
        detail: Box::new(detail.clone()),
        scheduler: Box::new(scheduler.clone()),
    };
    let mut h = Harness {
        engine: InteractionEngine::new(config, ports),
        scene,
        controls,
        table,
        detail,
        scheduler,
    };
    h.load(ids);
    h.engine.drain_events();
    h
}

impl Harness {
    pub fn load(&mut self, ids: &[&str]) {
        let records: Vec<Record> = ids.iter().map(|raw| record(raw)).collect();
        self.table.populate(&records);
        let positioned = records
            .into_iter()
            .enumerate()
            .map(|(n, r)| (r, item_position(n)))
            .collect();
        self.engine.load_positioned(positioned);
    }

    /// One frame, then deliver whatever deadlines fell due during it.
    pub fn step(&mut self) -> TickReport {
        let report = self.engine.update(FRAME);
        for probe in self.scheduler.advance(Duration::from_secs_f32(FRAME)) {
            self.engine.on_probe_deadline(probe);
        }
        report
    }

    pub fn click(&mut self) {
        self.engine.handle_event(InputEvent::PointerDown { button: MouseButton::Left });
    }

    pub fn key_down(&mut self, key: &str) {
        self.engine.handle_event(InputEvent::KeyDown { key: key.into(), focus: FocusTarget::Scene });
    }

    pub fn key_up(&mut self, key: &str) {
        self.engine.handle_event(InputEvent::KeyUp { key: key.into(), focus: FocusTarget::Scene });
    }

    pub fn aim_at(&self, target: Vec3) {
        let mut aim = self.controls.clone();
        aim.look_at(target);
    }

    pub fn selected(&self) -> Vec<ItemId> {
        self.engine.selection().selected().cloned().collect()
    }

    pub fn shown(&self) -> Option<ItemId> {
        self.detail.shown().map(|r| r.id)
    }

    /// Step until a tick reports a hit, or give up after `max_frames`.
    pub fn step_until_hit(&mut self, max_frames: usize) -> Option<TickReport> {
        (0..max_frames).map(|_| self.step()).find(|report| !report.hits.is_empty())
    }
}

/// Records every item id passed to the collision hook.
pub fn hook_log(engine: &mut InteractionEngine) -> Rc<RefCell<Vec<ItemId>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    engine.set_collision_hook(move |item| sink.borrow_mut().push(item.clone()));
    log
}

pub fn count_events(events: &[EngineEvent], pred: impl Fn(&EngineEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}
