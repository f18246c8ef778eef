use std::collections::HashSet;

use glam::Vec3;

use crate::config::EngineConfig;
use crate::controller::collision::CollisionDetector;
use crate::controller::input::{CaptureChange, FocusTarget, InputEvent, InputOutcome, InputProcessor, InputState, MouseButton};
use crate::controller::motion::{MotionController, MotionOutcome};
use crate::controller::projectile::{AdvanceOutcome, ProbeHit, ProjectileStats, ProjectileSystem};
use crate::controller::selection::{SelectionChange, SelectionCoordinator};
use crate::error::EngineError;
use crate::model::layout::grid_position;
use crate::model::{Item, ItemId, ItemRegistry, Probe, ProbeId, Record, RetireReason};
use crate::view::{Collaborators, ViewSyncBridge};

/// Observable engine happenings, in order. Drained by the host or tests.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    CaptureAcquired,
    CaptureReleased { cleared_keys: usize },
    CaptureDenied { reason: String },
    ProbeSpawned { probe: ProbeId },
    ProbeRetired { probe: ProbeId, reason: RetireReason },
    CollisionHit { probe: ProbeId, item: ItemId },
    SelectionChanged { last_selected: Option<ItemId>, selected: usize },
    StaleReference { item: ItemId },
    DatasetLoaded { items: usize },
    ItemsRemoved { items: usize },
    Disposed,
}

/// Summary of one `update` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub motion: MotionOutcome,
    pub hits: Vec<ProbeHit>,
    pub active_probes: usize,
    pub following: bool,
}

type CollisionHook = Box<dyn FnMut(&ItemId)>;

/// Owns the interaction state machine and drives the collaborators.
///
/// Two kinds of re-entry: `update` once per animation frame, and discrete
/// events (`handle_event`, `toggle_selection`, `on_probe_deadline`). Each
/// runs to completion before the next.
pub struct InteractionEngine {
    config: EngineConfig,
    processor: InputProcessor,
    input: InputState,
    motion: MotionController,
    projectiles: ProjectileSystem,
    detector: CollisionDetector,
    selection: SelectionCoordinator,
    bridge: ViewSyncBridge,
    items: ItemRegistry,
    ports: Collaborators,
    collision_hook: Option<CollisionHook>,
    journal: Vec<EngineEvent>,
    disposed: bool,
}

impl InteractionEngine {
    pub fn new(config: EngineConfig, ports: Collaborators) -> Self {
        Self {
            processor: InputProcessor::new(config.bindings.clone()),
            input: InputState::new(),
            motion: MotionController::new(&config),
            projectiles: ProjectileSystem::new(&config),
            detector: CollisionDetector::new(config.hit_radius),
            selection: SelectionCoordinator::new(),
            bridge: ViewSyncBridge::new(&config),
            items: ItemRegistry::new(),
            ports,
            collision_hook: None,
            journal: Vec::new(),
            disposed: false,
            config,
        }
    }

    // ===== Queries =====

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn items(&self) -> &ItemRegistry {
        &self.items
    }

    pub fn selection(&self) -> &SelectionCoordinator {
        &self.selection
    }

    pub fn projectile_stats(&self) -> ProjectileStats {
        self.projectiles.stats()
    }

    pub fn active_probes(&self) -> usize {
        self.projectiles.active_count()
    }

    pub fn is_probe_active(&self, id: ProbeId) -> bool {
        self.projectiles.is_active(id)
    }

    pub fn probe(&self, id: ProbeId) -> Option<&Probe> {
        self.projectiles.get(id)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn viewpoint_position(&self) -> Vec3 {
        self.ports.controls.position()
    }

    pub fn viewpoint_direction(&self) -> Vec3 {
        self.ports.controls.world_direction()
    }

    /// The first item within hit radius of the viewpoint, if any.
    pub fn item_near_viewpoint(&self) -> Option<&Item> {
        self.detector.check(self.ports.controls.position(), self.items.iter())
    }

    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        std::mem::take(&mut self.journal)
    }

    /// Called with the item id whenever a probe hits an item.
    pub fn set_collision_hook(&mut self, hook: impl FnMut(&ItemId) + 'static) {
        self.collision_hook = Some(Box::new(hook));
    }

    // ===== Dataset =====

    /// Rebuild all items from `records`, laid out on the floor grid.
    pub fn load_dataset(&mut self, records: Vec<Record>) {
        let positioned: Vec<(Record, Vec3)> = records
            .into_iter()
            .enumerate()
            .map(|(n, record)| {
                let position = grid_position(n, self.config.grid_columns, self.config.grid_spacing);
                (record, position)
            })
            .collect();
        self.load_positioned(positioned);
    }

    /// Rebuild all items wholesale. Selections whose ids survive the reload
    /// stay selected; the rest are pruned.
    pub fn load_positioned(&mut self, records: Vec<(Record, Vec3)>) {
        if self.disposed {
            return;
        }

        for old in self.items.take_all() {
            self.ports.scene.remove_visual(old.visual);
        }
        for (record, position) in records {
            let visual = self.ports.scene.register_item(&record.id, position);
            if let Some(dup) = self.items.insert(Item::new(record, position, visual)) {
                tracing::warn!(id = %dup.id, "duplicate id in dataset, keeping the later row");
                self.ports.scene.remove_visual(dup.visual);
            }
        }

        let valid: HashSet<ItemId> = self.items.ids().cloned().collect();
        let change = self.selection.prune(&valid);
        self.publish(&change);
        self.bridge.reapply(&self.selection, &mut self.items, &mut self.ports);

        tracing::info!(items = self.items.len(), selected = self.selection.len(), "dataset loaded");
        self.journal.push(EngineEvent::DatasetLoaded { items: self.items.len() });
    }

    /// Delete rows: their visuals go away and stale selections are purged.
    pub fn remove_items(&mut self, ids: &[ItemId]) -> usize {
        if self.disposed {
            return 0;
        }

        let mut removed = 0;
        for id in ids {
            match self.items.remove(id) {
                Some(item) => {
                    self.ports.scene.remove_visual(item.visual);
                    removed += 1;
                }
                None => self.stale(id),
            }
        }

        let valid: HashSet<ItemId> = self.items.ids().cloned().collect();
        let change = self.selection.prune(&valid);
        self.publish(&change);

        self.journal.push(EngineEvent::ItemsRemoved { items: removed });
        removed
    }

    // ===== Selection =====

    /// Entry point for table checkbox changes and collision hits alike.
    pub fn toggle_selection(&mut self, id: &ItemId, selected: bool) -> SelectionChange {
        if self.disposed {
            return SelectionChange::default();
        }
        if selected && !self.items.contains(id) {
            self.stale(id);
            return SelectionChange::default();
        }

        let change = self.selection.toggle(id, selected);
        self.publish(&change);
        change
    }

    pub fn clear_selection(&mut self) -> SelectionChange {
        if self.disposed {
            return SelectionChange::default();
        }
        let change = self.selection.clear();
        self.publish(&change);
        change
    }

    fn publish(&mut self, change: &SelectionChange) {
        if change.is_empty() {
            return;
        }
        self.bridge.apply(change, &mut self.items, &mut self.ports);
        self.journal.push(EngineEvent::SelectionChanged {
            last_selected: change.last_selected.clone(),
            selected: change.remaining,
        });
    }

    fn stale(&mut self, id: &ItemId) {
        tracing::warn!(%id, "{}", EngineError::UnknownItem(id.clone()));
        self.journal.push(EngineEvent::StaleReference { item: id.clone() });
    }

    // ===== Input =====

    pub fn handle_event(&mut self, event: InputEvent) {
        if self.disposed {
            return;
        }

        match &event {
            InputEvent::KeyDown { key, focus: FocusTarget::Scene } if self.processor.is_escape(key) => {
                self.release_capture();
                return;
            }
            InputEvent::PointerDown { button } => {
                self.on_pointer_down(*button);
                return;
            }
            _ => {}
        }

        if let InputOutcome::Capture(change) = self.input.process_event(&event, &self.processor) {
            self.record_capture(change);
        }
    }

    fn on_pointer_down(&mut self, button: MouseButton) {
        if !self.input.is_captured() {
            // Clicking the scene asks for capture, it never fires.
            let _ = self.request_capture();
            return;
        }
        if button == MouseButton::Left {
            let _ = self.fire();
        }
    }

    /// Ask the controls for exclusive capture. Denial leaves the engine
    /// uncaptured; motion keeps skipping.
    pub fn request_capture(&mut self) -> Result<(), EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        if let Err(err) = self.ports.controls.request_lock() {
            tracing::warn!(error = %err, "capture request failed");
            self.journal.push(EngineEvent::CaptureDenied { reason: err.to_string() });
            return Err(err);
        }
        // Browsers confirm later via a capture-changed event.
        if self.ports.controls.is_locked() {
            self.on_capture_change(true);
        }
        Ok(())
    }

    pub fn release_capture(&mut self) {
        if self.disposed {
            return;
        }
        self.ports.controls.release_lock();
        if !self.ports.controls.is_locked() {
            self.on_capture_change(false);
        }
    }

    pub fn on_capture_change(&mut self, active: bool) -> CaptureChange {
        if self.disposed {
            return CaptureChange::Unchanged;
        }
        let change = self.input.on_capture_change(active);
        self.record_capture(change);
        change
    }

    fn record_capture(&mut self, change: CaptureChange) {
        match change {
            CaptureChange::Acquired => self.journal.push(EngineEvent::CaptureAcquired),
            CaptureChange::Released { cleared } => {
                self.journal.push(EngineEvent::CaptureReleased { cleared_keys: cleared })
            }
            CaptureChange::Unchanged => {}
        }
    }

    // ===== Probes =====

    /// Launch a probe from the viewpoint along the view direction.
    pub fn fire(&mut self) -> Result<ProbeId, EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        let origin = self.ports.controls.position();
        let direction = self.ports.controls.world_direction();
        self.spawn_probe(origin, direction)
    }

    pub fn spawn_probe(&mut self, origin: Vec3, direction: Vec3) -> Result<ProbeId, EngineError> {
        if self.disposed {
            return Err(EngineError::Disposed);
        }
        let probe = self
            .projectiles
            .spawn(origin, direction, self.ports.scene.as_mut(), self.ports.scheduler.as_mut())
            .inspect_err(|err| tracing::warn!(error = %err, "probe not spawned"))?;
        self.journal.push(EngineEvent::ProbeSpawned { probe });
        Ok(probe)
    }

    /// Deadline timer for `probe` fired. No-op if the tick path got there first.
    pub fn on_probe_deadline(&mut self, probe: ProbeId) -> bool {
        if self.disposed {
            return false;
        }
        let retired = self
            .projectiles
            .on_deadline(probe, self.ports.scene.as_mut(), self.ports.scheduler.as_mut());
        if retired {
            self.journal.push(EngineEvent::ProbeRetired { probe, reason: RetireReason::Deadline });
        }
        retired
    }

    // ===== Frame =====

    /// Advance one animation frame.
    pub fn update(&mut self, delta: f32) -> TickReport {
        if self.disposed {
            return TickReport {
                motion: MotionOutcome::Skipped,
                hits: Vec::new(),
                active_probes: 0,
                following: false,
            };
        }

        let motion = self.motion.tick(delta, &mut self.input, self.ports.controls.as_mut());
        if motion.is_moving() {
            self.bridge.cancel_follow();
        }
        let following = self.bridge.advance_follow(delta, self.ports.controls.as_mut());

        let AdvanceOutcome { retired, hits } = self.projectiles.advance(
            &self.items,
            &self.detector,
            self.ports.scene.as_mut(),
            self.ports.scheduler.as_mut(),
        );
        self.journal
            .extend(retired.into_iter().map(|(probe, reason)| EngineEvent::ProbeRetired { probe, reason }));

        for hit in &hits {
            tracing::info!(probe = %hit.probe, item = %hit.item, "probe hit item");
            self.journal.push(EngineEvent::CollisionHit { probe: hit.probe, item: hit.item.clone() });
            if let Some(hook) = self.collision_hook.as_mut() {
                hook(&hit.item);
            }
            let selected = !self.selection.contains(&hit.item);
            self.toggle_selection(&hit.item, selected);
        }

        TickReport {
            motion,
            hits,
            active_probes: self.projectiles.active_count(),
            following,
        }
    }

    // ===== Teardown =====

    /// Cancel every pending deadline and evict every probe visual. The
    /// engine ignores all further calls.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let evicted = self
            .projectiles
            .dispose(self.ports.scene.as_mut(), self.ports.scheduler.as_mut());
        self.bridge.cancel_follow();
        if self.ports.controls.is_locked() {
            self.ports.controls.release_lock();
        }
        self.input.on_capture_change(false);
        self.disposed = true;
        self.collision_hook = None;
        tracing::info!(evicted, "interaction engine disposed");
        self.journal.push(EngineEvent::Disposed);
    }
}
