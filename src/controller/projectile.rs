//! Probe lifecycle: spawn, per-tick advance, and idempotent retirement.
//!
//! Each probe can be retired by the tick path (range, orphaned visual, hit)
//! or by its deadline timer, whichever comes first. Every path checks
//! active-set membership first, so the loser finds nothing to do.

use std::time::Duration;

use glam::Vec3;
use indexmap::IndexMap;

use crate::config::EngineConfig;
use crate::controller::collision::CollisionDetector;
use crate::error::EngineError;
use crate::model::{ItemId, ItemRegistry, Probe, ProbeId, RetireReason};
use crate::view::{DeadlineScheduler, SceneRegistry, VisualKind};

/// A probe that struck an item during [`ProjectileSystem::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHit {
    pub probe: ProbeId,
    pub item: ItemId,
}

/// Everything the tick path retired, and which of those were hits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvanceOutcome {
    pub retired: Vec<(ProbeId, RetireReason)>,
    pub hits: Vec<ProbeHit>,
}

/// Lifetime counters. `active == spawned - retired()` at all times.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectileStats {
    pub spawned: u64,
    pub retired_range: u64,
    pub retired_deadline: u64,
    pub retired_hit: u64,
    pub retired_orphaned: u64,
    pub retired_disposed: u64,
}

impl ProjectileStats {
    pub fn retired(&self) -> u64 {
        self.retired_range + self.retired_deadline + self.retired_hit + self.retired_orphaned + self.retired_disposed
    }

    fn record(&mut self, reason: RetireReason) {
        match reason {
            RetireReason::Range => self.retired_range += 1,
            RetireReason::Deadline => self.retired_deadline += 1,
            RetireReason::Hit => self.retired_hit += 1,
            RetireReason::Orphaned => self.retired_orphaned += 1,
            RetireReason::Disposed => self.retired_disposed += 1,
        }
    }
}

/// Longest deadline a browser timer can hold (`i32::MAX` ms).
const MAX_LIFETIME: Duration = Duration::from_millis(i32::MAX as u64);

/// Negative and NaN lifetimes expire at once; oversized ones are capped.
fn lifetime_from_secs(secs: f32) -> Duration {
    Duration::try_from_secs_f32(secs.max(0.0))
        .unwrap_or(MAX_LIFETIME)
        .min(MAX_LIFETIME)
}

#[derive(Debug)]
pub struct ProjectileSystem {
    active: IndexMap<ProbeId, Probe>,
    next_id: u64,
    speed: f32,
    max_range: f32,
    lifetime: Duration,
    stats: ProjectileStats,
}

impl ProjectileSystem {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            active: IndexMap::new(),
            next_id: 0,
            speed: config.probe_speed,
            max_range: config.probe_max_range,
            lifetime: lifetime_from_secs(config.probe_lifetime),
            stats: ProjectileStats::default(),
        }
    }

    /// Launch a probe one unit in front of `origin` along `direction`.
    pub fn spawn(
        &mut self,
        origin: Vec3,
        direction: Vec3,
        scene: &mut dyn SceneRegistry,
        scheduler: &mut dyn DeadlineScheduler,
    ) -> Result<ProbeId, EngineError> {
        let direction = direction.try_normalize().ok_or(EngineError::DegenerateDirection)?;
        let id = ProbeId(self.next_id);
        self.next_id += 1;

        let position = origin + direction;
        let visual = scene.add_visual(VisualKind::Probe, position);
        let deadline = scheduler.schedule(id, self.lifetime);

        self.active.insert(
            id,
            Probe {
                id,
                position,
                direction,
                distance_traveled: 0.0,
                max_range: self.max_range,
                visual,
                deadline,
            },
        );
        self.stats.spawned += 1;
        tracing::debug!(%id, ?position, ?direction, "probe spawned");
        Ok(id)
    }

    /// Advance every active probe by one step and collect hits.
    pub fn advance(
        &mut self,
        items: &ItemRegistry,
        detector: &CollisionDetector,
        scene: &mut dyn SceneRegistry,
        scheduler: &mut dyn DeadlineScheduler,
    ) -> AdvanceOutcome {
        let mut outcome = AdvanceOutcome::default();
        let ids: Vec<ProbeId> = self.active.keys().copied().collect();

        for id in ids {
            let Some(probe) = self.active.get_mut(&id) else {
                continue;
            };
            probe.advance(self.speed);

            let verdict = if probe.range_exceeded() {
                Some((RetireReason::Range, None))
            } else if !scene.contains_visual(probe.visual) {
                Some((RetireReason::Orphaned, None))
            } else {
                scene.set_visual_position(probe.visual, probe.position);
                detector
                    .check(probe.position, items.iter())
                    .map(|item| (RetireReason::Hit, Some(item.id.clone())))
            };

            if let Some((reason, item)) = verdict {
                self.retire(id, reason, scene, scheduler);
                outcome.retired.push((id, reason));
                if let Some(item) = item {
                    outcome.hits.push(ProbeHit { probe: id, item });
                }
            }
        }
        outcome
    }

    /// Remove a probe from the active set. Returns false if it was already gone.
    pub fn retire(
        &mut self,
        id: ProbeId,
        reason: RetireReason,
        scene: &mut dyn SceneRegistry,
        scheduler: &mut dyn DeadlineScheduler,
    ) -> bool {
        let Some(probe) = self.active.shift_remove(&id) else {
            tracing::debug!(%id, ?reason, "probe already retired");
            return false;
        };

        scheduler.cancel(probe.deadline);
        if !scene.remove_visual(probe.visual) {
            tracing::debug!(%id, "probe visual already gone");
        }
        self.stats.record(reason);
        tracing::debug!(%id, ?reason, distance = probe.distance_traveled, "probe retired");
        true
    }

    /// Deadline-timer path. A probe retired by the tick path is left alone.
    pub fn on_deadline(
        &mut self,
        id: ProbeId,
        scene: &mut dyn SceneRegistry,
        scheduler: &mut dyn DeadlineScheduler,
    ) -> bool {
        self.retire(id, RetireReason::Deadline, scene, scheduler)
    }

    /// Retire everything, cancelling all pending deadlines.
    pub fn dispose(&mut self, scene: &mut dyn SceneRegistry, scheduler: &mut dyn DeadlineScheduler) -> usize {
        let ids: Vec<ProbeId> = self.active.keys().copied().collect();
        ids.into_iter()
            .filter(|id| self.retire(*id, RetireReason::Disposed, scene, scheduler))
            .count()
    }

    pub fn is_active(&self, id: ProbeId) -> bool {
        self.active.contains_key(&id)
    }

    pub fn get(&self, id: ProbeId) -> Option<&Probe> {
        self.active.get(&id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn stats(&self) -> ProjectileStats {
        self.stats
    }
}
