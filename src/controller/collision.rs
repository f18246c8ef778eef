use glam::Vec3;

use crate::model::Item;

/// Proximity hit test against registered items.
///
/// Pure: it reports the hit and leaves selection to the caller.
#[derive(Debug, Clone, Copy)]
pub struct CollisionDetector {
    pub hit_radius: f32,
}

impl CollisionDetector {
    pub fn new(hit_radius: f32) -> Self {
        Self { hit_radius }
    }

    /// First item (in iteration order) strictly closer than the hit radius.
    pub fn check<'a>(&self, position: Vec3, items: impl IntoIterator<Item = &'a Item>) -> Option<&'a Item> {
        let radius_sq = self.hit_radius * self.hit_radius;
        items
            .into_iter()
            .find(|item| position.distance_squared(item.position) < radius_sq)
    }
}
