use glam::Vec3;

const PITCH_LIMIT: f32 = 1.5533; // Slightly less than π/2 to avoid gimbal lock

/// First-person eye: position plus yaw/pitch orientation.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewpoint {
    pub eye: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub up: Vec3,
}

impl Default for Viewpoint {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 1.6, 10.0))
    }
}

impl Viewpoint {
    pub fn new(eye: Vec3) -> Self {
        Self {
            eye,
            yaw: 0.0,
            pitch: 0.0,
            up: Vec3::Y,
        }
    }

    pub fn forward(&self) -> Vec3 {
        let cy = self.yaw;
        let cp = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        Vec3::new(cy.cos() * cp.cos(), cp.sin(), cy.sin() * cp.cos()).normalize()
    }

    pub fn target(&self) -> Vec3 {
        self.eye + self.forward()
    }

    pub fn set_look_at(&mut self, target: Vec3) {
        let Some(dir) = (target - self.eye).try_normalize() else {
            return;
        };
        self.yaw = dir.z.atan2(dir.x);
        self.pitch = dir.y.asin().clamp(-1.4, 1.4);
    }

    /// Rotate by mouse-look deltas (radians).
    pub fn rotate(&mut self, yaw_delta: f32, pitch_delta: f32) {
        let pi_half = std::f32::consts::FRAC_PI_2;
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-pi_half, pi_half);
    }

    /// Forward direction flattened onto the ground plane.
    fn horizontal_forward(&self) -> Vec3 {
        Vec3::new(self.yaw.cos(), 0.0, self.yaw.sin())
    }

    /// Walk along the ground plane; looking up or down does not change speed.
    pub fn move_forward(&mut self, distance: f32) {
        self.eye += self.horizontal_forward() * distance;
    }

    pub fn move_right(&mut self, distance: f32) {
        let right = self.horizontal_forward().cross(self.up).normalize();
        self.eye += right * distance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn move_forward_ignores_pitch() {
        let mut vp = Viewpoint::new(Vec3::ZERO);
        vp.pitch = 1.0;
        vp.move_forward(2.0);
        assert!(vp.eye.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn move_right_is_perpendicular_to_forward() {
        let mut vp = Viewpoint::new(Vec3::ZERO);
        vp.move_right(1.0);
        assert!(vp.eye.abs_diff_eq(Vec3::new(0.0, 0.0, 1.0), 1e-5));
        assert!(vp.eye.dot(vp.forward()).abs() < 1e-5);
    }

    #[test]
    fn look_at_points_forward_at_target() {
        let mut vp = Viewpoint::new(Vec3::new(0.0, 2.0, 0.0));
        let target = Vec3::new(3.0, 2.0, 4.0);
        vp.set_look_at(target);
        let expected = (target - vp.eye).normalize();
        assert!(vp.forward().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn look_at_own_position_keeps_orientation() {
        let mut vp = Viewpoint::new(Vec3::ONE);
        vp.yaw = 0.3;
        vp.set_look_at(Vec3::ONE);
        assert_eq!(vp.yaw, 0.3);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut vp = Viewpoint::default();
        vp.rotate(0.0, 10.0);
        assert!(vp.pitch <= std::f32::consts::FRAC_PI_2);
    }
}
