use std::fmt;

use glam::Vec3;

use super::VisualHandle;
use crate::view::TimerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeId(pub u64);

impl fmt::Display for ProbeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe#{}", self.0)
    }
}

/// Why a probe left the active set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetireReason {
    /// Travelled its full range without hitting anything.
    Range,
    /// Its deadline timer fired first.
    Deadline,
    /// Came within the hit radius of an item.
    Hit,
    /// Its visual disappeared from the scene behind our back.
    Orphaned,
    Disposed,
}

/// A short-lived selection projectile.
#[derive(Debug, Clone)]
pub struct Probe {
    pub id: ProbeId,
    pub position: Vec3,
    /// Always unit length.
    pub direction: Vec3,
    pub distance_traveled: f32,
    pub max_range: f32,
    pub visual: VisualHandle,
    pub deadline: TimerHandle,
}

impl Probe {
    pub fn advance(&mut self, step: f32) {
        self.position += self.direction * step;
        self.distance_traveled += step;
    }

    pub fn range_exceeded(&self) -> bool {
        self.distance_traveled >= self.max_range
    }
}
